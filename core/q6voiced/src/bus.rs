//! System bus connection and the blocking event loop.

use crate::dispatch::{self, InboundSignal, Outcome};
use crate::error::{Result, VoicedError};
use crate::hook::HookRunner;
use crate::runtime::AudioBackend;
use crate::session::Session;
use q6voiced_protocol::{STATE_CHANGED_MEMBER, SUBSCRIBED_INTERFACES};
use zbus::blocking::fdo::DBusProxy;
use zbus::blocking::{Connection, MessageIterator};
use zbus::message::Type as MessageType;
use zbus::{MatchRule, Message};

pub struct Subscription {
    // Keeps the connection alive for the iterator.
    _connection: Connection,
    messages: MessageIterator,
}

/// Connects to the system bus and registers one signal match rule per
/// subscribed interface.
pub fn subscribe() -> Result<Subscription> {
    let connection = Connection::system().map_err(VoicedError::bus("connect"))?;
    // Created before AddMatch so no early signal is missed.
    let messages = MessageIterator::from(&connection);

    let proxy = DBusProxy::new(&connection).map_err(VoicedError::bus("proxy"))?;
    for interface in SUBSCRIBED_INTERFACES {
        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .interface(interface)
            .map_err(VoicedError::bus("match rule"))?
            .build();
        proxy
            .add_match_rule(rule)
            .map_err(|source| VoicedError::Bus {
                context: "AddMatch",
                source: source.into(),
            })?;
        tracing::debug!(interface, "Subscribed to signals");
    }

    Ok(Subscription {
        _connection: connection,
        messages,
    })
}

/// Processes messages one at a time until the bus connection ends.
pub fn run<H, B>(subscription: Subscription, session: &mut Session<H, B>) -> Result<()>
where
    H: HookRunner,
    B: AudioBackend,
{
    for message in subscription.messages {
        let message = message.map_err(VoicedError::bus("receive"))?;
        let outcome = dispatch::dispatch(session, &BusSignal(&message))?;
        if let Outcome::StateChanged(transition) = outcome {
            tracing::debug!(?transition, in_session = session.in_session(), "Handled state change");
        }
    }
    tracing::info!("Bus message stream ended");
    Ok(())
}

struct BusSignal<'a>(&'a Message);

impl InboundSignal for BusSignal<'_> {
    fn interface(&self) -> Option<String> {
        self.0.header().interface().map(|name| name.to_string())
    }

    fn member(&self) -> Option<String> {
        self.0.header().member().map(|name| name.to_string())
    }

    fn state_pair(&self) -> Result<(i32, i32)> {
        let body = self.0.body();
        let signature = body
            .signature()
            .map(|signature| signature.to_string())
            .unwrap_or_default();
        let malformed = || VoicedError::MalformedSignal {
            member: STATE_CHANGED_MEMBER.to_string(),
            signature: signature.clone(),
        };

        // ModemManager appends a uint32 reason; older releases send only the pair.
        let decoded = match signature.as_str() {
            "ii" => body.deserialize::<(i32, i32)>(),
            "iiu" => body
                .deserialize::<(i32, i32, u32)>()
                .map(|(old, new, _reason)| (old, new)),
            _ => return Err(malformed()),
        };
        decoded.map_err(|_| malformed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use q6voiced_protocol::{CALL_INTERFACE, MODEM_VOICE_INTERFACE};
    use serde::Serialize;
    use zbus::zvariant::DynamicType;

    const CALL_PATH: &str = "/org/freedesktop/ModemManager1/Call/0";

    fn state_changed<B: Serialize + DynamicType>(body: &B) -> Message {
        Message::signal(CALL_PATH, CALL_INTERFACE, STATE_CHANGED_MEMBER)
            .expect("signal builder")
            .build(body)
            .expect("build signal")
    }

    #[test]
    fn decodes_state_pair() {
        let message = state_changed(&(0i32, 4i32));
        let signal = BusSignal(&message);
        assert_eq!(signal.interface().as_deref(), Some(CALL_INTERFACE));
        assert_eq!(signal.member().as_deref(), Some(STATE_CHANGED_MEMBER));
        assert_eq!(signal.state_pair().expect("decode"), (0, 4));
    }

    #[test]
    fn decodes_state_pair_with_reason() {
        let message = state_changed(&(4i32, 7i32, 1u32));
        assert_eq!(BusSignal(&message).state_pair().expect("decode"), (4, 7));
    }

    #[test]
    fn unsigned_pair_is_malformed() {
        let message = state_changed(&(0u32, 4u32));
        let err = BusSignal(&message).state_pair().expect_err("wrong types");
        match err {
            VoicedError::MalformedSignal { member, signature } => {
                assert_eq!(member, STATE_CHANGED_MEMBER);
                assert_eq!(signature, "uu");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn empty_body_is_malformed() {
        let message = state_changed(&());
        let err = BusSignal(&message).state_pair().expect_err("empty body");
        assert!(matches!(err, VoicedError::MalformedSignal { .. }));
    }

    #[test]
    fn call_added_headers_pass_through() {
        let message = Message::signal(
            "/org/freedesktop/ModemManager1/Modem/0",
            MODEM_VOICE_INTERFACE,
            "CallAdded",
        )
        .expect("signal builder")
        .build(&(zbus::zvariant::ObjectPath::try_from(CALL_PATH).expect("path"),))
        .expect("build signal");
        let signal = BusSignal(&message);
        assert_eq!(signal.interface().as_deref(), Some(MODEM_VOICE_INTERFACE));
        assert_eq!(signal.member().as_deref(), Some("CallAdded"));
    }
}
