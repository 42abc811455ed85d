//! Link layer over an H4 (UART) HCI transport
//!
//! Commands are framed with [`HciCommand::encode`] and written out whole.
//! Events are reassembled byte by byte through an [`EventParser`], so a
//! transport may hand over partial packets.

use core::fmt;

use veil_core::HciErrorCode;
use veil_hal::{HciTransport, LinkLayer};
use veil_protocol::{opcode, EventParser, HciCommand, HciEvent, PacketError};

/// Transport reads spent waiting for a bring-up completion
const BRING_UP_POLLS: usize = 64;

/// What the attached controller reported during bring-up
///
/// The LE feature mask is read by the host stack before the privacy
/// controller is constructed and passed in. The resolving list size can be
/// refreshed with [`H4LinkLayer::read_resolving_list_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
    pub ll_privacy: bool,
    pub resolving_list_size: u8,
}

/// H4 link layer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum H4Error<E> {
    Transport(E),
    Encode(PacketError),
    /// A bring-up command failed on the controller
    Rejected(HciErrorCode),
    /// No completion arrived for a bring-up command
    NoResponse,
}

impl<E: fmt::Debug> fmt::Display for H4Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            H4Error::Transport(e) => write!(f, "transport error: {:?}", e),
            H4Error::Encode(e) => write!(f, "encode error: {}", e),
            H4Error::Rejected(status) => write!(f, "command rejected: {:?}", status),
            H4Error::NoResponse => write!(f, "no response from controller"),
        }
    }
}

/// [`LinkLayer`] speaking H4 over an [`HciTransport`]
pub struct H4LinkLayer<T> {
    transport: T,
    parser: EventParser,
    capabilities: Capabilities,
    radio_active: bool,
}

impl<T: HciTransport> H4LinkLayer<T> {
    pub fn new(transport: T, capabilities: Capabilities) -> Self {
        Self {
            transport,
            parser: EventParser::new(),
            capabilities,
            radio_active: false,
        }
    }

    /// Track advertising, scanning or initiating state from the GAP layer
    pub fn set_radio_active(&mut self, active: bool) {
        self.radio_active = active;
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Ask the controller for its resolving list size and keep the answer
    ///
    /// Meant for bring-up, before the privacy controller starts issuing
    /// commands: events for other commands read meanwhile are dropped.
    pub fn read_resolving_list_size(&mut self) -> Result<u8, H4Error<T::Error>> {
        self.send_command(&HciCommand::LeReadResolvingListSize)?;
        for _ in 0..BRING_UP_POLLS {
            let Some(event) = self.poll_event() else {
                continue;
            };
            if event.opcode() != Some(opcode::LE_READ_RESOLVING_LIST_SIZE) || !event.is_final() {
                continue;
            }
            return match event.resolving_list_size() {
                Some(size) => {
                    debug!("resolving list size: {}", size);
                    self.capabilities.resolving_list_size = size;
                    Ok(size)
                }
                None => Err(H4Error::Rejected(
                    event.status().unwrap_or(HciErrorCode::UNSPECIFIED_ERROR),
                )),
            };
        }
        warn!("no answer to LE Read Resolving List Size");
        Err(H4Error::NoResponse)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: HciTransport> LinkLayer for H4LinkLayer<T> {
    type Error = H4Error<T::Error>;

    fn send_command(&mut self, command: &HciCommand) -> Result<(), Self::Error> {
        let packet = command.encode_to_vec().map_err(H4Error::Encode)?;
        self.transport
            .write_blocking(&packet)
            .map_err(H4Error::Transport)?;
        self.transport.flush().map_err(H4Error::Transport)
    }

    fn supports_ll_privacy(&self) -> bool {
        self.capabilities.ll_privacy
    }

    fn resolving_list_size(&self) -> u8 {
        if self.capabilities.ll_privacy {
            self.capabilities.resolving_list_size
        } else {
            0
        }
    }

    fn is_radio_active(&self) -> bool {
        self.radio_active
    }

    fn poll_event(&mut self) -> Option<HciEvent> {
        let mut byte = [0u8; 1];
        loop {
            match self.transport.read_available(&mut byte) {
                Ok(1) => {}
                Ok(_) => return None,
                Err(_) => {
                    warn!("HCI transport read failed");
                    return None;
                }
            }
            match self.parser.feed(byte[0]) {
                Ok(Some(event)) => return Some(event),
                Ok(None) => {}
                Err(e) => {
                    warn!("discarding malformed HCI event: {}", e);
                    self.parser.reset();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::{Deque, Vec};

    /// Records written bytes and replays queued input
    #[derive(Default)]
    struct MockTransport {
        written: Vec<u8, 128>,
        input: Deque<u8, 128>,
        flushes: usize,
    }

    impl MockTransport {
        fn inject(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.input.push_back(b).unwrap();
            }
        }
    }

    impl HciTransport for MockTransport {
        type Error = ();

        fn write_blocking(&mut self, data: &[u8]) -> Result<(), ()> {
            self.written.extend_from_slice(data).map_err(|_| ())
        }

        fn flush(&mut self) -> Result<(), ()> {
            self.flushes += 1;
            Ok(())
        }

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
            let mut n = 0;
            while n < buf.len() {
                match self.input.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    fn link() -> H4LinkLayer<MockTransport> {
        H4LinkLayer::new(
            MockTransport::default(),
            Capabilities {
                ll_privacy: true,
                resolving_list_size: 12,
            },
        )
    }

    #[test]
    fn test_send_writes_h4_packet() {
        let mut link = link();
        link.send_command(&HciCommand::LeClearResolvingList).unwrap();
        assert_eq!(&link.transport().written[..], &[0x01, 0x29, 0x20, 0x00]);
        assert_eq!(link.transport().flushes, 1);
    }

    #[test]
    fn test_poll_reassembles_event() {
        let mut link = link();
        // Command Complete for LE Clear Resolving List, status success
        link.transport_mut()
            .inject(&[0x04, 0x0E, 0x04, 0x01, 0x29, 0x20, 0x00]);

        let event = link.poll_event().unwrap();
        assert_eq!(event.opcode(), Some(opcode::LE_CLEAR_RESOLVING_LIST));
        assert_eq!(event.status(), Some(HciErrorCode::SUCCESS));
        assert_eq!(link.poll_event(), None);
    }

    #[test]
    fn test_poll_partial_then_rest() {
        let mut link = link();
        link.transport_mut().inject(&[0x04, 0x0F, 0x04]);
        assert_eq!(link.poll_event(), None);

        link.transport_mut().inject(&[0x0C, 0x01, 0x2D, 0x20]);
        let event = link.poll_event().unwrap();
        assert!(event.is_final());
        assert_eq!(event.status(), Some(HciErrorCode::COMMAND_DISALLOWED));
    }

    #[test]
    fn test_read_resolving_list_size() {
        let mut link = link();
        // a stray completion first, then the size answer
        link.transport_mut()
            .inject(&[0x04, 0x0E, 0x04, 0x01, 0x29, 0x20, 0x00]);
        link.transport_mut()
            .inject(&[0x04, 0x0E, 0x05, 0x01, 0x2A, 0x20, 0x00, 0x05]);

        assert_eq!(link.read_resolving_list_size(), Ok(5));
        assert_eq!(&link.transport().written[..], &[0x01, 0x2A, 0x20, 0x00]);
        assert_eq!(link.capabilities().resolving_list_size, 5);
        assert_eq!(link.resolving_list_size(), 5);
    }

    #[test]
    fn test_read_resolving_list_size_failures() {
        let mut link = link();
        link.transport_mut()
            .inject(&[0x04, 0x0F, 0x04, 0x01, 0x01, 0x2A, 0x20]);
        assert_eq!(
            link.read_resolving_list_size(),
            Err(H4Error::Rejected(HciErrorCode::UNKNOWN_HCI_COMMAND))
        );

        assert_eq!(link.read_resolving_list_size(), Err(H4Error::NoResponse));
        assert_eq!(link.capabilities().resolving_list_size, 12);
    }

    #[test]
    fn test_capabilities() {
        let mut link = H4LinkLayer::new(
            MockTransport::default(),
            Capabilities {
                ll_privacy: false,
                resolving_list_size: 12,
            },
        );
        assert!(!link.supports_ll_privacy());
        assert_eq!(link.resolving_list_size(), 0);
        link.set_radio_active(true);
        assert!(link.is_radio_active());
    }
}
