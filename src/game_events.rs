//! Messages sent by the in-game plugin over UDP.
//!
//! Every datagram is a JSON object `{"cmd": "<name>", "data": ...}`. Only the
//! command name matters here; payloads are kept as raw JSON.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{HighlightError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameCommand {
    Init,
    EndReplay,
    EndStats,
    TeamNames,
    Demolished,
    Scored,
    MatchId,
    Start,
    End,
    Stats,
    Goals,
    EpicSave,
    Dbg,
    DisplayNames,
    PlayerTable,
    Time,
    Boost,
    SubScore,
    Score,
    Player,
}

impl GameCommand {
    /// Goals and epic saves are worth keeping as a clip.
    pub fn triggers_replay(&self) -> bool {
        matches!(self, GameCommand::Scored | GameCommand::EpicSave)
    }
}

#[derive(Debug, Deserialize)]
pub struct GameMessage {
    pub cmd: GameCommand,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Deserialize)]
struct RawMessage {
    cmd: String,
    #[serde(default)]
    data: Option<Value>,
}

pub fn parse_message(json: &str) -> Result<GameMessage> {
    let raw: RawMessage = serde_json::from_str(json)?;
    let cmd = serde_json::from_value(Value::String(raw.cmd.clone()))
        .map_err(|_| HighlightError::UnknownCommand(raw.cmd))?;
    Ok(GameMessage {
        cmd,
        data: raw.data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_command(json: &str) -> Result<GameCommand> {
        parse_message(json).map(|message| message.cmd)
    }

    #[test]
    fn goal_and_epic_save_trigger_a_replay() {
        let scored = parse_command(r#"{"cmd":"scored","data":null}"#).unwrap();
        let save = parse_command(r#"{"cmd":"epicSave"}"#).unwrap();
        assert_eq!(scored, GameCommand::Scored);
        assert_eq!(save, GameCommand::EpicSave);
        assert!(scored.triggers_replay());
        assert!(save.triggers_replay());
    }

    #[test]
    fn other_commands_do_not_trigger() {
        let time = parse_command(r#"{"cmd":"time","data":{"time":297,"isOvertime":0}}"#).unwrap();
        assert_eq!(time, GameCommand::Time);
        assert!(!time.triggers_replay());
        assert!(!GameCommand::Dbg.triggers_replay());
    }

    #[test]
    fn payload_is_kept_as_json() {
        let message = parse_message(
            r#"{"cmd":"teamNames","data":{"blue":"Blue","orange":"Orange","matchId":"DA3FB72C"}}"#,
        )
        .unwrap();
        assert_eq!(message.cmd, GameCommand::TeamNames);
        let data = message.data.unwrap();
        assert_eq!(data["matchId"], "DA3FB72C");
    }

    #[test]
    fn multi_word_names_use_camel_case() {
        assert_eq!(
            parse_command(r#"{"cmd":"displayNames","data":["a","b"]}"#).unwrap(),
            GameCommand::DisplayNames
        );
        assert_eq!(
            parse_command(r#"{"cmd":"endReplay"}"#).unwrap(),
            GameCommand::EndReplay
        );
        assert_eq!(
            parse_command(r#"{"cmd":"subScore","data":{"goals":1,"shots":2,"assists":0,"saves":3}}"#)
                .unwrap(),
            GameCommand::SubScore
        );
    }

    #[test]
    fn unknown_command_is_reported_by_name() {
        match parse_command(r#"{"cmd":"kickoff"}"#) {
            Err(HighlightError::UnknownCommand(name)) => assert_eq!(name, "kickoff"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            parse_command("scored"),
            Err(HighlightError::Json(_))
        ));
        assert!(matches!(
            parse_command(r#"{"data":1}"#),
            Err(HighlightError::Json(_))
        ));
    }
}
