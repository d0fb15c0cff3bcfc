//! Typed mutation requests
//!
//! Web handlers receive strings. These constructors turn one form row into
//! an [`Intent`] or an `InvalidArgument` error before anything touches the
//! network.

use serde::{Deserialize, Serialize};
use snapcast_api::Operation;
use snapcast_state::{ClientId, GroupId, GroupSelection};

use crate::error::{BridgeError, Result};

/// One mutation a user asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    SetClientVolume { client_id: ClientId, volume: u8 },
    SetGroupSelection {
        group_id: GroupId,
        selection: GroupSelection,
    },
    ReassignClient { client_id: ClientId, group_id: GroupId },
}

impl Intent {
    /// Volume row: client id plus a decimal volume
    pub fn volume_from_form(client_id: &str, value: &str) -> Result<Self> {
        let client_id = required("client id", client_id)?;
        let value = value.trim();
        let volume: i64 = value
            .parse()
            .map_err(|_| BridgeError::InvalidArgument(format!("volume is not a number: {value:?}")))?;
        let volume = u8::try_from(volume)
            .map_err(|_| BridgeError::InvalidArgument(format!("volume out of range: {volume}")))?;

        Ok(Intent::SetClientVolume {
            client_id: ClientId::new(client_id),
            volume,
        })
    }

    /// Stream selector row: group id plus a stream id or `"0"` for mute
    pub fn selection_from_form(group_id: &str, value: &str) -> Result<Self> {
        let group_id = required("group id", group_id)?;
        let selection = GroupSelection::from_form_value(value)
            .ok_or_else(|| BridgeError::InvalidArgument("stream selection is empty".to_string()))?;

        Ok(Intent::SetGroupSelection {
            group_id: GroupId::new(group_id),
            selection,
        })
    }

    /// Zone row: client id plus the group it should join
    pub fn reassign_from_form(client_id: &str, group_id: &str) -> Result<Self> {
        Ok(Intent::ReassignClient {
            client_id: ClientId::new(required("client id", client_id)?),
            group_id: GroupId::new(required("group id", group_id)?),
        })
    }
}

fn required<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BridgeError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(value)
}

/// What a successful intent put on the wire, in order
///
/// Empty when the intent was already satisfied and nothing was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub issued: Vec<Operation>,
}

impl Confirmation {
    pub(crate) fn of(issued: Vec<Operation>) -> Self {
        Self { issued }
    }

    pub fn nothing_sent() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.issued.is_empty()
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.issued.iter().map(Operation::method).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;
    use rstest::rstest;
    use snapcast_state::StreamId;

    #[test]
    fn test_volume_from_form() {
        assert_eq!(
            Intent::volume_from_form("c1", " 42 ").unwrap(),
            Intent::SetClientVolume {
                client_id: ClientId::new("c1"),
                volume: 42,
            }
        );
    }

    #[rstest]
    #[case("c1", "loud")]
    #[case("c1", "")]
    #[case("c1", "-1")]
    #[case("c1", "256")]
    #[case("c1", "4.5")]
    #[case("", "10")]
    fn test_volume_from_form_rejects(#[case] client: &str, #[case] value: &str) {
        let err = Intent::volume_from_form(client, value).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_selection_from_form() {
        assert_eq!(
            Intent::selection_from_form("g1", "0").unwrap(),
            Intent::SetGroupSelection {
                group_id: GroupId::new("g1"),
                selection: GroupSelection::Mute,
            }
        );
        assert_eq!(
            Intent::selection_from_form("g1", "Spotify").unwrap(),
            Intent::SetGroupSelection {
                group_id: GroupId::new("g1"),
                selection: GroupSelection::Stream(StreamId::new("Spotify")),
            }
        );
        assert!(Intent::selection_from_form("g1", "").is_err());
    }

    #[test]
    fn test_intent_json_shape() {
        let intent: Intent = serde_json::from_str(
            r#"{"type":"reassign_client","client_id":"c1","group_id":"g2"}"#,
        )
        .unwrap();
        assert_eq!(intent, Intent::reassign_from_form("c1", "g2").unwrap());
    }

    #[test]
    fn test_confirmation_methods() {
        let confirmation = Confirmation::of(vec![
            Operation::SetGroupMute {
                group_id: "g1".to_string(),
                mute: false,
            },
            Operation::SetGroupStream {
                group_id: "g1".to_string(),
                stream_id: "s1".to_string(),
            },
        ]);
        assert_eq!(confirmation.methods(), vec!["Group.SetMute", "Group.SetStream"]);
        assert!(Confirmation::nothing_sent().is_noop());
    }

    proptest! {
        #[test]
        fn prop_volume_from_form_accepts_exactly_u8(value in -1_000i64..1_000) {
            let parsed = Intent::volume_from_form("c1", &value.to_string());
            match u8::try_from(value) {
                Ok(volume) => prop_assert_eq!(
                    parsed.unwrap(),
                    Intent::SetClientVolume { client_id: ClientId::new("c1"), volume }
                ),
                Err(_) => prop_assert_eq!(parsed.unwrap_err().kind(), ErrorKind::InvalidArgument),
            }
        }
    }
}
