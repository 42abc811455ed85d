//! Property tests for the H4 event parser

use proptest::prelude::*;
use veil_core::HciErrorCode;
use veil_protocol::packet::MAX_EVENT_PACKET_SIZE;
use veil_protocol::{EventParser, HciEvent, PACKET_TYPE_EVENT};

fn completion() -> impl Strategy<Value = HciEvent> {
    prop_oneof![
        (any::<u16>(), any::<u8>(), prop::collection::vec(any::<u8>(), 0..=16)).prop_map(
            |(opcode, status, ret)| {
                HciEvent::command_complete(opcode, HciErrorCode::from_raw(status), &ret).unwrap()
            }
        ),
        (any::<u16>(), any::<u8>()).prop_map(|(opcode, status)| {
            HciEvent::command_status(opcode, HciErrorCode::from_raw(status))
        }),
    ]
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut parser = EventParser::new();
        for b in bytes {
            if parser.feed(b).is_err() {
                parser.reset();
            }
        }
    }

    #[test]
    fn events_survive_leading_noise(
        noise in prop::collection::vec(
            any::<u8>().prop_filter("not an event type", |b| *b != PACKET_TYPE_EVENT),
            0..32,
        ),
        event in completion(),
    ) {
        let mut buf = [0u8; MAX_EVENT_PACKET_SIZE];
        let len = event.encode(&mut buf).unwrap();

        let mut parser = EventParser::new();
        for b in noise {
            prop_assert_eq!(parser.feed(b), Ok(None));
        }
        prop_assert_eq!(parser.feed_bytes(&buf[..len]), Ok(Some(event)));
    }
}
