/*!

This is the long-form manual for `gamevote_core` and `gamevote`.

## The voting cycle

1. An administrator opens voting (`gamevote open`). Opening while voting is
   already open does nothing.
2. Every voter picks exactly two different enabled candidates
   (`gamevote --user ann vote Azul Catan`). A voter can vote once per period.
   A vote from an earlier period does not prevent voting again.
3. An administrator closes voting (`gamevote close`). The votes cast between
   the opening and the closing time (both included) are counted and the
   winner is recorded.
4. Anybody can look at the outcome (`gamevote results`) until the next
   period opens. Results are never shown while voting is open.

## How the winner is chosen

Each ballot counts as one vote for each of its two candidates. The candidate
with the most votes wins, with the reason `MostVotes`. When several
candidates share the highest count, one of them is drawn at random, every
tied candidate having the same chance, and the reason is `Random`.

Candidates without any vote never take part in a draw.

When nobody voted, there is no winner and no result is recorded.

The draw can be made reproducible by passing `--seed` or setting
`randomSeed` in the configuration file.

## Candidates

Administrators add candidates (`gamevote add-candidate`), import them from a
CSV file (`gamevote import`) and enable or disable them
(`gamevote enable`, `gamevote disable`). Only enabled candidates can be
chosen on a ballot.

> Note: candidates can be disabled while voting is open. Votes already cast
> for them are kept and counted.

### CSV import

```text
name,enabled
Azul,true
Catan,
Wingspan,false
```

The header row is required. The `enabled` column is optional and defaults
to enabled when missing or empty.

## Configuration

The program accepts a configuration file in JSON. Every field is optional.

```text
{
  "stateFile": "gamevote_state.json",
  "randomSeed": 42,
  "admins": ["alice"],
  "reasons": {
    "mostVotes": "Won with the most votes.",
    "random": "Won a random draw between the tied games."
  }
}
```

 - `stateFile` (string): where the candidates, votes, period and results are
   kept between invocations. Overridden by `--state`.
 - `randomSeed` (number): seed for the tie-break draw. Overridden by `--seed`.
 - `admins` (array of strings): the users allowed to open and close voting
   and to manage candidates.
 - `reasons` (object): the explanation printed next to each reason code.

## Recovering a missing result

If a period was closed but its result could not be recorded, `results`
reports an incomplete tally. Since votes are never deleted, an administrator
can record the result afterwards with `gamevote retally`.

 */
