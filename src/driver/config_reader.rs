use crate::driver::*;

use gamevote_core::{Identity, ReasonTexts, VoterId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STATE_FILE: &str = "gamevote_state.json";
pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ReasonSettings {
    #[serde(rename = "mostVotes")]
    pub most_votes: Option<String>,
    pub random: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "stateFile")]
    pub state_file: Option<String>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<u64>,
    pub admins: Option<Vec<String>>,
    pub reasons: Option<ReasonSettings>,
}

impl AppConfig {
    pub fn reason_texts(&self) -> ReasonTexts {
        let defaults = ReasonTexts::default();
        match &self.reasons {
            Some(r) => ReasonTexts {
                most_votes: r.most_votes.clone().unwrap_or(defaults.most_votes),
                random: r.random.clone().unwrap_or(defaults.random),
            },
            None => defaults,
        }
    }

    /// The identity of the user, as far as this command line is concerned.
    pub fn identity(&self, user: Option<&str>) -> Identity {
        let name = user.unwrap_or(ANONYMOUS_USER);
        let is_admin = self
            .admins
            .as_ref()
            .map(|admins| admins.iter().any(|a| a == name))
            .unwrap_or(false);
        Identity {
            voter: VoterId::new(name),
            is_admin,
        }
    }
}

pub fn read_config(path: &str) -> CliResult<AppConfig> {
    let contents = fs::read_to_string(path).context(ReadingFileSnafu { path })?;
    debug!("read config: {:?}", contents);
    let config: AppConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(config)
}
