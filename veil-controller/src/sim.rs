//! Simulated link layer
//!
//! Executes the privacy command set in memory and queues the completion
//! events a real controller would send, with the statuses the Core
//! specification prescribes. Drive it from a [`Controller`] with
//! [`Controller::dispatch_pending`].
//!
//! [`Controller`]: crate::controller::Controller
//! [`Controller::dispatch_pending`]: crate::controller::Controller::dispatch_pending

use core::fmt;

use heapless::{Deque, Vec};
use veil_core::crypto;
use veil_core::{Address, HciErrorCode, Irk, PeerAddressType, PrivacyMode};
use veil_hal::LinkLayer;
use veil_protocol::{HciCommand, HciEvent, PacketError};

use crate::controller::MAX_RESOLVING_LIST_SIZE;

/// Completion events the simulation holds before they must be polled
pub const SIM_EVENT_QUEUE_DEPTH: usize = 16;

/// Commands remembered for inspection
const SENT_HISTORY: usize = 32;

/// Capabilities of the simulated link layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimConfig {
    pub ll_privacy: bool,
    pub resolving_list_size: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ll_privacy: true,
            resolving_list_size: 8,
        }
    }
}

/// Command submission failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimError {
    /// The event queue has no room for the completion
    QueueFull,
    /// Failure injected with [`SimLinkLayer::fail_next_submit`]
    Injected,
    Packet(PacketError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::QueueFull => write!(f, "event queue full"),
            SimError::Injected => write!(f, "injected submission failure"),
            SimError::Packet(e) => write!(f, "{}", e),
        }
    }
}

impl From<PacketError> for SimError {
    fn from(e: PacketError) -> Self {
        SimError::Packet(e)
    }
}

#[derive(Debug, Clone, Copy)]
struct SimEntry {
    peer_address_type: PeerAddressType,
    peer_identity_address: Address,
    peer_irk: Irk,
    privacy_mode: PrivacyMode,
}

/// In-memory link layer with LL privacy
pub struct SimLinkLayer {
    config: SimConfig,
    entries: Vec<SimEntry, MAX_RESOLVING_LIST_SIZE>,
    events: Deque<HciEvent, SIM_EVENT_QUEUE_DEPTH>,
    sent: Vec<u16, SENT_HISTORY>,
    address_resolution: bool,
    rpa_timeout_s: u16,
    radio_active: bool,
    fail_next_submit: bool,
    fail_next_command: Option<HciErrorCode>,
}

impl Default for SimLinkLayer {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimLinkLayer {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            events: Deque::new(),
            sent: Vec::new(),
            address_resolution: false,
            rpa_timeout_s: 900,
            radio_active: false,
            fail_next_submit: false,
            fail_next_command: None,
        }
    }

    /// Reject the next `send_command` outright
    pub fn fail_next_submit(&mut self) {
        self.fail_next_submit = true;
    }

    /// Answer the next command with a Command Status carrying `status`
    pub fn fail_next_command(&mut self, status: HciErrorCode) {
        self.fail_next_command = Some(status);
    }

    /// Mark advertising, scanning or initiating as running
    pub fn set_radio_active(&mut self, active: bool) {
        self.radio_active = active;
    }

    /// Opcodes of accepted commands, oldest first
    pub fn sent_opcodes(&self) -> &[u16] {
        &self.sent
    }

    pub fn entries_len(&self) -> usize {
        self.entries.len()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn address_resolution_enabled(&self) -> bool {
        self.address_resolution
    }

    pub fn rpa_timeout_s(&self) -> u16 {
        self.rpa_timeout_s
    }

    pub fn privacy_mode_of(
        &self,
        peer_address_type: PeerAddressType,
        peer_identity_address: &Address,
    ) -> Option<PrivacyMode> {
        self.find(peer_address_type, peer_identity_address)
            .map(|i| self.entries[i].privacy_mode)
    }

    /// Resolve `address` against the resolving list, as the radio would on receive
    pub fn resolve_address(&self, address: &Address) -> Option<(PeerAddressType, Address)> {
        if !self.address_resolution {
            return None;
        }
        self.entries
            .iter()
            .find(|e| crypto::resolves(address, &e.peer_irk))
            .map(|e| (e.peer_address_type, e.peer_identity_address))
    }

    fn find(&self, peer_address_type: PeerAddressType, address: &Address) -> Option<usize> {
        self.entries.iter().position(|e| {
            e.peer_address_type == peer_address_type && e.peer_identity_address == *address
        })
    }

    /// Resolving list changes are disallowed while resolution runs on an active radio
    fn list_locked(&self) -> bool {
        self.address_resolution && self.radio_active
    }

    /// Execute `command`, returning the completion status and return parameters
    fn execute(&mut self, command: &HciCommand) -> (HciErrorCode, Vec<u8, 16>) {
        let mut ret = Vec::new();

        let privacy_command = !matches!(command, HciCommand::LeEncrypt { .. });
        if privacy_command && !self.config.ll_privacy {
            return (HciErrorCode::UNKNOWN_HCI_COMMAND, ret);
        }

        let status = match command {
            HciCommand::LeEncrypt { key, plaintext } => {
                let block = crypto::encrypt_le(key, plaintext);
                // 16 bytes always fit
                let _ = ret.extend_from_slice(&block);
                HciErrorCode::SUCCESS
            }
            HciCommand::LeAddDeviceToResolvingList {
                peer_address_type,
                peer_identity_address,
                peer_irk,
                ..
            } => {
                if self.list_locked() {
                    HciErrorCode::COMMAND_DISALLOWED
                } else if self.find(*peer_address_type, peer_identity_address).is_some() {
                    HciErrorCode::INVALID_HCI_COMMAND_PARAMETERS
                } else if self.entries.len() >= usize::from(self.config.resolving_list_size) {
                    HciErrorCode::MEMORY_CAPACITY_EXCEEDED
                } else {
                    let entry = SimEntry {
                        peer_address_type: *peer_address_type,
                        peer_identity_address: *peer_identity_address,
                        peer_irk: *peer_irk,
                        privacy_mode: PrivacyMode::NETWORK,
                    };
                    match self.entries.push(entry) {
                        Ok(()) => HciErrorCode::SUCCESS,
                        Err(_) => HciErrorCode::MEMORY_CAPACITY_EXCEEDED,
                    }
                }
            }
            HciCommand::LeRemoveDeviceFromResolvingList {
                peer_address_type,
                peer_identity_address,
            } => {
                if self.list_locked() {
                    HciErrorCode::COMMAND_DISALLOWED
                } else {
                    match self.find(*peer_address_type, peer_identity_address) {
                        Some(i) => {
                            self.entries.remove(i);
                            HciErrorCode::SUCCESS
                        }
                        None => HciErrorCode::UNKNOWN_CONNECTION_IDENTIFIER,
                    }
                }
            }
            HciCommand::LeClearResolvingList => {
                if self.list_locked() {
                    HciErrorCode::COMMAND_DISALLOWED
                } else {
                    self.entries.clear();
                    HciErrorCode::SUCCESS
                }
            }
            HciCommand::LeReadResolvingListSize => {
                let _ = ret.push(self.config.resolving_list_size);
                HciErrorCode::SUCCESS
            }
            HciCommand::LeSetAddressResolutionEnable { enable } => {
                if self.radio_active {
                    HciErrorCode::COMMAND_DISALLOWED
                } else {
                    self.address_resolution = *enable;
                    HciErrorCode::SUCCESS
                }
            }
            HciCommand::LeSetResolvablePrivateAddressTimeout { timeout } => {
                self.rpa_timeout_s = timeout.value();
                HciErrorCode::SUCCESS
            }
            HciCommand::LeSetPrivacyMode {
                peer_address_type,
                peer_identity_address,
                privacy_mode,
            } => {
                if self.list_locked() {
                    HciErrorCode::COMMAND_DISALLOWED
                } else {
                    match self.find(*peer_address_type, peer_identity_address) {
                        Some(i) => {
                            self.entries[i].privacy_mode = *privacy_mode;
                            HciErrorCode::SUCCESS
                        }
                        None => HciErrorCode::UNKNOWN_CONNECTION_IDENTIFIER,
                    }
                }
            }
        };

        if !status.is_success() {
            ret.clear();
        }
        (status, ret)
    }
}

impl LinkLayer for SimLinkLayer {
    type Error = SimError;

    fn send_command(&mut self, command: &HciCommand) -> Result<(), SimError> {
        if core::mem::take(&mut self.fail_next_submit) {
            return Err(SimError::Injected);
        }
        if self.events.is_full() {
            return Err(SimError::QueueFull);
        }

        let opcode = command.opcode();
        let event = match self.fail_next_command.take() {
            Some(status) => HciEvent::command_status(opcode, status),
            None => {
                let (status, ret) = self.execute(command);
                HciEvent::command_complete(opcode, status, &ret)?
            }
        };

        if self.sent.is_full() {
            self.sent.remove(0);
        }
        let _ = self.sent.push(opcode);
        self.events
            .push_back(event)
            .map_err(|_| SimError::QueueFull)
    }

    fn supports_ll_privacy(&self) -> bool {
        self.config.ll_privacy
    }

    fn resolving_list_size(&self) -> u8 {
        if self.config.ll_privacy {
            self.config.resolving_list_size
        } else {
            0
        }
    }

    fn is_radio_active(&self) -> bool {
        self.radio_active
    }

    fn poll_event(&mut self) -> Option<HciEvent> {
        self.events.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::ResolvableAddressTimeout;
    use veil_protocol::opcode;

    const PEER: Address = Address::new([0x11, 0x22, 0x33, 0x44, 0x55, 0xC6]);
    const PEER_IRK: Irk = Irk::new([0x42; 16]);

    fn add(peer: Address) -> HciCommand {
        HciCommand::LeAddDeviceToResolvingList {
            peer_address_type: PeerAddressType::RANDOM,
            peer_identity_address: peer,
            peer_irk: PEER_IRK,
            local_irk: Irk::new([0x01; 16]),
        }
    }

    fn next_status(sim: &mut SimLinkLayer) -> HciErrorCode {
        sim.poll_event().and_then(|e| e.status()).unwrap()
    }

    #[test]
    fn test_encrypt_matches_host() {
        let mut sim = SimLinkLayer::default();
        let key = [0x10; 16];
        let plaintext = crypto::prand_block([0x94, 0x81, 0x70]);
        sim.send_command(&HciCommand::LeEncrypt { key, plaintext })
            .unwrap();

        let event = sim.poll_event().unwrap();
        assert_eq!(event.opcode(), Some(opcode::LE_ENCRYPT));
        assert_eq!(event.encrypted_data(), Some(crypto::encrypt_le(&key, &plaintext)));
    }

    #[test]
    fn test_add_duplicate_and_full() {
        let mut sim = SimLinkLayer::new(SimConfig {
            ll_privacy: true,
            resolving_list_size: 1,
        });
        sim.send_command(&add(PEER)).unwrap();
        sim.send_command(&add(PEER)).unwrap();
        sim.send_command(&add(Address::new([9; 6]))).unwrap();

        assert_eq!(next_status(&mut sim), HciErrorCode::SUCCESS);
        assert_eq!(next_status(&mut sim), HciErrorCode::INVALID_HCI_COMMAND_PARAMETERS);
        assert_eq!(next_status(&mut sim), HciErrorCode::MEMORY_CAPACITY_EXCEEDED);
        assert_eq!(sim.entries_len(), 1);
    }

    #[test]
    fn test_remove_unknown_peer() {
        let mut sim = SimLinkLayer::default();
        sim.send_command(&HciCommand::LeRemoveDeviceFromResolvingList {
            peer_address_type: PeerAddressType::RANDOM,
            peer_identity_address: PEER,
        })
        .unwrap();
        assert_eq!(
            next_status(&mut sim),
            HciErrorCode::UNKNOWN_CONNECTION_IDENTIFIER
        );
    }

    #[test]
    fn test_list_locked_while_resolving_on_air() {
        let mut sim = SimLinkLayer::default();
        sim.send_command(&HciCommand::LeSetAddressResolutionEnable { enable: true })
            .unwrap();
        assert_eq!(next_status(&mut sim), HciErrorCode::SUCCESS);

        sim.set_radio_active(true);
        sim.send_command(&HciCommand::LeClearResolvingList).unwrap();
        assert_eq!(next_status(&mut sim), HciErrorCode::COMMAND_DISALLOWED);
    }

    #[test]
    fn test_resolve_address_uses_peer_irk() {
        let mut sim = SimLinkLayer::default();
        sim.send_command(&add(PEER)).unwrap();
        sim.send_command(&HciCommand::LeSetAddressResolutionEnable { enable: true })
            .unwrap();

        let rpa = crypto::make_rpa(&PEER_IRK, [0x01, 0x02, 0x43]);
        assert_eq!(
            sim.resolve_address(&rpa),
            Some((PeerAddressType::RANDOM, PEER))
        );
        let other = crypto::make_rpa(&Irk::new([0x43; 16]), [0x01, 0x02, 0x43]);
        assert_eq!(sim.resolve_address(&other), None);
    }

    #[test]
    fn test_without_ll_privacy() {
        let mut sim = SimLinkLayer::new(SimConfig {
            ll_privacy: false,
            resolving_list_size: 8,
        });
        assert_eq!(sim.resolving_list_size(), 0);
        sim.send_command(&HciCommand::LeSetResolvablePrivateAddressTimeout {
            timeout: ResolvableAddressTimeout::new(60),
        })
        .unwrap();
        assert_eq!(next_status(&mut sim), HciErrorCode::UNKNOWN_HCI_COMMAND);
        assert_eq!(sim.rpa_timeout_s(), 900);
    }

    #[test]
    fn test_injected_failures() {
        let mut sim = SimLinkLayer::default();
        sim.fail_next_submit();
        assert_eq!(
            sim.send_command(&HciCommand::LeClearResolvingList),
            Err(SimError::Injected)
        );

        sim.fail_next_command(HciErrorCode::CONTROLLER_BUSY);
        sim.send_command(&HciCommand::LeClearResolvingList).unwrap();
        let event = sim.poll_event().unwrap();
        assert!(event.is_final());
        assert_eq!(event.status(), Some(HciErrorCode::CONTROLLER_BUSY));
        assert_eq!(sim.sent_opcodes(), &[opcode::LE_CLEAR_RESOLVING_LIST]);
    }
}
