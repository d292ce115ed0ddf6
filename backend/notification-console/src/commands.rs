use std::str::FromStr;
use thiserror::Error;

use crate::orchestrator::Action;

pub const HELP: &str = "\
Commands:
  create-topic                 create a new topic
  delete-topic                 delete the stored topic
  subscribe-device             subscribe this device to the topic
  unsubscribe-device           remove the device subscription
  subscribe-email <address>    subscribe an email address to the topic
  unsubscribe-email <address>  unsubscribe an email address
  send                         publish the test message to the topic
  delete-endpoint              delete this device's platform endpoint
  token <value>                simulate a registration token refresh
  receive <json>               simulate an inbound push payload
  status                       show stored identifiers
  help                         show this help
  quit                         exit";

/// One line of console input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Action),
    Token(String),
    Receive(String),
    Status,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0} (type `help` for a list)")]
    Unknown(String),

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let argument = |command: &'static str, argument: &'static str| {
            if rest.is_empty() {
                Err(ParseError::MissingArgument { command, argument })
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match name {
            "" => return Err(ParseError::Empty),
            "create-topic" => Command::Run(Action::CreateTopic),
            "delete-topic" => Command::Run(Action::DeleteTopic),
            "subscribe-device" => Command::Run(Action::SubscribeDevice),
            "unsubscribe-device" => Command::Run(Action::UnsubscribeDevice),
            "subscribe-email" => {
                Command::Run(Action::SubscribeEmail(argument("subscribe-email", "address")?))
            }
            "unsubscribe-email" => Command::Run(Action::UnsubscribeEmail(argument(
                "unsubscribe-email",
                "address",
            )?)),
            "send" => Command::Run(Action::SendMessage),
            "delete-endpoint" => Command::Run(Action::DeletePlatformEndpoint),
            "token" => Command::Token(argument("token", "value")?),
            "receive" => Command::Receive(argument("receive", "json")?),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };

        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            "create-topic".parse::<Command>().unwrap(),
            Command::Run(Action::CreateTopic)
        );
        assert_eq!(
            "  send  ".parse::<Command>().unwrap(),
            Command::Run(Action::SendMessage)
        );
        assert_eq!(
            "subscribe-email ops@example.com".parse::<Command>().unwrap(),
            Command::Run(Action::SubscribeEmail("ops@example.com".into()))
        );
    }

    #[test]
    fn test_receive_keeps_json_intact() {
        assert_eq!(
            r#"receive {"message": "hi there"}"#.parse::<Command>().unwrap(),
            Command::Receive(r#"{"message": "hi there"}"#.into())
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(ParseError::Empty));
        assert_eq!(
            "unsubscribe-email".parse::<Command>(),
            Err(ParseError::MissingArgument {
                command: "unsubscribe-email",
                argument: "address"
            })
        );
        assert!(matches!(
            "launch".parse::<Command>(),
            Err(ParseError::Unknown(name)) if name == "launch"
        ));
    }
}
