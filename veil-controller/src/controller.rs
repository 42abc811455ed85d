//! Private address controller over an HCI link layer
//!
//! Requests are translated into HCI commands and remembered in a bounded
//! FIFO tagged by the opcode they wait on. Every Command Complete (or failing
//! Command Status) closes the oldest request with the same opcode, so RPA
//! generation and resolution can share `LE Encrypt` and still be told apart.
//!
//! `terminate()` turns outstanding requests into tombstones. A tombstone
//! still absorbs its one completion, so a late answer can never close a
//! request made after the next `initialize()`, and still applies link state
//! changes the link layer confirms, but reports nothing.
//!
//! The controller mirrors resolving list occupancy (type, address and
//! privacy mode, never keys) to reject overflow and unknown peers before
//! anything reaches the link layer.

use heapless::Vec;
use rand::RngCore;
use veil_core::crypto::{self, RPA_PART_LEN};
use veil_core::{
    Address, HciErrorCode, Irk, PeerAddressType, PrivacyConfig, PrivacyMode,
    ResolvableAddressTimeout,
};
use veil_hal::{
    EventHandler, LinkLayer, PrivacyError, PrivateAddressController, ResolvingListAction,
    ResolvingListCompletion,
};
use veil_protocol::{opcode, HciCommand, HciEvent};

/// Resolving list entries the controller can mirror
pub const MAX_RESOLVING_LIST_SIZE: usize = 32;

/// Requests that may await completion at once
pub const MAX_PENDING_REQUESTS: usize = 8;

/// Draws from the RNG before giving up on a usable random value
const RANDOM_ATTEMPTS: usize = 4;

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lifecycle {
    /// `initialize()` not called yet
    Uninitialized,
    /// Accepting requests
    Running,
    /// `terminate()` called; `initialize()` starts over
    Terminated,
}

/// Request awaiting its completion event
#[derive(Debug, Clone, Copy)]
#[cfg_attr(not(feature = "host-resolution"), allow(dead_code))]
enum Pending {
    GenerateRpa {
        prand: [u8; RPA_PART_LEN],
    },
    Resolve {
        address: Address,
    },
    ListAction(ResolvingListAction),
    /// Follow-up applying the configured privacy mode to a new entry
    DefaultPrivacyMode {
        peer_address_type: PeerAddressType,
        peer_identity_address: Address,
        privacy_mode: PrivacyMode,
    },
    AddressResolution(bool),
    RpaTimeout(ResolvableAddressTimeout),
}

impl Pending {
    fn opcode(&self) -> u16 {
        match self {
            Pending::GenerateRpa { .. } | Pending::Resolve { .. } => opcode::LE_ENCRYPT,
            Pending::ListAction(ResolvingListAction::Add { .. }) => {
                opcode::LE_ADD_DEVICE_TO_RESOLVING_LIST
            }
            Pending::ListAction(ResolvingListAction::Remove { .. }) => {
                opcode::LE_REMOVE_DEVICE_FROM_RESOLVING_LIST
            }
            Pending::ListAction(ResolvingListAction::Clear) => opcode::LE_CLEAR_RESOLVING_LIST,
            Pending::ListAction(ResolvingListAction::SetPrivacyMode { .. })
            | Pending::DefaultPrivacyMode { .. } => opcode::LE_SET_PRIVACY_MODE,
            Pending::AddressResolution(_) => opcode::LE_SET_ADDRESS_RESOLUTION_ENABLE,
            Pending::RpaTimeout(_) => opcode::LE_SET_RESOLVABLE_PRIVATE_ADDRESS_TIMEOUT,
        }
    }

    fn is_add_of(&self, peer_address_type: PeerAddressType, address: &Address) -> bool {
        matches!(
            self,
            Pending::ListAction(ResolvingListAction::Add {
                peer_address_type: t,
                peer_identity_address: a,
            }) if *t == peer_address_type && a == address
        )
    }
}

/// Slot in the pending FIFO
#[derive(Debug, Clone, Copy)]
struct Outstanding {
    request: Pending,
    /// Issued before the last `terminate()`; completes without reporting
    discarded: bool,
}

/// Mirrored resolving list entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListEntry {
    peer_address_type: PeerAddressType,
    peer_identity_address: Address,
    privacy_mode: PrivacyMode,
}

impl ListEntry {
    fn matches(&self, peer_address_type: PeerAddressType, address: &Address) -> bool {
        self.peer_address_type == peer_address_type && self.peer_identity_address == *address
    }
}

/// [`PrivateAddressController`] driving a [`LinkLayer`]
///
/// Constructed once at wiring time and passed by reference to the GAP layer.
/// Completions are fed back through [`Controller::on_link_event`] or, for
/// polled transports, [`Controller::dispatch_pending`].
pub struct Controller<'h, L, R> {
    link: L,
    rng: R,
    config: PrivacyConfig,
    handler: Option<&'h dyn EventHandler>,
    lifecycle: Lifecycle,
    pending: Vec<Outstanding, MAX_PENDING_REQUESTS>,
    entries: Vec<ListEntry, MAX_RESOLVING_LIST_SIZE>,
    address_resolution_enabled: bool,
    rpa_timeout: ResolvableAddressTimeout,
}

impl<'h, L: LinkLayer, R: RngCore> Controller<'h, L, R> {
    /// Create a controller with the default privacy configuration
    pub fn new(link: L, rng: R) -> Self {
        Self::with_config(link, rng, PrivacyConfig::default())
    }

    /// Create a controller applying `config` on `initialize()`
    pub fn with_config(link: L, rng: R, config: PrivacyConfig) -> Self {
        Self {
            link,
            rng,
            config,
            handler: None,
            lifecycle: Lifecycle::Uninitialized,
            pending: Vec::new(),
            entries: Vec::new(),
            address_resolution_enabled: false,
            rpa_timeout: config.rpa_timeout,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> &PrivacyConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// An RPA generation is awaiting its completion
    pub fn generating_rpa(&self) -> bool {
        self.pending
            .iter()
            .any(|o| !o.discarded && matches!(o.request, Pending::GenerateRpa { .. }))
    }

    /// An RPA resolution is awaiting its completion
    pub fn resolving_rpa(&self) -> bool {
        self.pending
            .iter()
            .any(|o| !o.discarded && matches!(o.request, Pending::Resolve { .. }))
    }

    /// Requests of any kind awaiting completion, tombstones included
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Confirmed resolving list entries
    pub fn resolving_list_len(&self) -> usize {
        self.entries.len()
    }

    /// Privacy mode of a confirmed resolving list entry
    pub fn privacy_mode_of(
        &self,
        peer_address_type: PeerAddressType,
        peer_identity_address: &Address,
    ) -> Option<PrivacyMode> {
        self.entries
            .iter()
            .find(|e| e.matches(peer_address_type, peer_identity_address))
            .map(|e| e.privacy_mode)
    }

    /// Link-layer address resolution state confirmed by the link layer
    pub fn address_resolution_enabled(&self) -> bool {
        self.address_resolution_enabled
    }

    /// RPA rotation period last confirmed by the link layer
    pub fn rpa_timeout(&self) -> ResolvableAddressTimeout {
        self.rpa_timeout
    }

    /// Drain events from a polled link layer
    ///
    /// Returns the number of events processed.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut count = 0;
        while let Some(event) = self.link.poll_event() {
            self.on_link_event(&event);
            count += 1;
        }
        count
    }

    /// Inbound link-layer event
    ///
    /// Events that do not close a command and completions nobody waits for
    /// are dropped. Completions for requests issued before `terminate()` are
    /// absorbed by their tombstone.
    pub fn on_link_event(&mut self, event: &HciEvent) {
        if !event.is_final() {
            return;
        }
        let (Some(opcode), Some(status)) = (event.opcode(), event.status()) else {
            return;
        };
        let Some(index) = self
            .pending
            .iter()
            .position(|o| o.request.opcode() == opcode)
        else {
            debug!("dropping unsolicited completion {:#x}", opcode);
            return;
        };

        let Outstanding { request, discarded } = self.pending.remove(index);
        trace!("completion {:#x} status {:?}", opcode, status);
        if discarded {
            debug!("completion {:#x} closes a discarded request", opcode);
            self.absorb(request, status);
        } else {
            self.complete(request, status, event);
        }
    }

    /// Close a discarded request, keeping the mirror in step with the link layer
    fn absorb(&mut self, request: Pending, status: HciErrorCode) {
        match request {
            Pending::GenerateRpa { .. } | Pending::Resolve { .. } => {}
            Pending::ListAction(action) => {
                if status.is_success() {
                    self.apply(action);
                }
            }
            other => self.complete_state(other, status),
        }
    }

    fn complete(&mut self, request: Pending, status: HciErrorCode, event: &HciEvent) {
        match request {
            Pending::GenerateRpa { prand } => {
                let address = match event.encrypted_data() {
                    Some(block) => Address::from_rpa_parts(crypto::hash_from_block(&block), prand),
                    None => {
                        warn!("RPA generation failed: {:?}", status);
                        Address::INVALID
                    }
                };
                self.emit(|h| h.on_resolvable_private_address_generated(&address));
            }
            Pending::Resolve { address } => {
                let resolved = match event.encrypted_data() {
                    Some(block) => crypto::hash_from_block(&block) == address.rpa_hash(),
                    None => {
                        warn!("RPA resolution failed: {:?}", status);
                        false
                    }
                };
                self.emit(|h| h.on_private_address_resolved(resolved));
            }
            Pending::ListAction(action) => {
                if status.is_success() {
                    self.apply(action);
                } else {
                    warn!("resolving list action failed: {:?}", status);
                }
                let completion = ResolvingListCompletion { action, status };
                self.emit(|h| h.on_resolving_list_action_complete(&completion));
            }
            other => self.complete_state(other, status),
        }
    }

    /// Completions that only update link state
    fn complete_state(&mut self, request: Pending, status: HciErrorCode) {
        match request {
            Pending::DefaultPrivacyMode {
                peer_address_type,
                peer_identity_address,
                privacy_mode,
            } => {
                if status.is_success() {
                    self.set_entry_mode(peer_address_type, &peer_identity_address, privacy_mode);
                } else {
                    warn!(
                        "default privacy mode for {} not applied: {:?}",
                        peer_identity_address,
                        status
                    );
                }
            }
            Pending::AddressResolution(enable) => {
                if status.is_success() {
                    self.address_resolution_enabled = enable;
                    info!("address resolution enabled: {}", enable);
                } else {
                    warn!("set address resolution failed: {:?}", status);
                }
            }
            Pending::RpaTimeout(timeout) => {
                if status.is_success() {
                    self.rpa_timeout = timeout;
                    info!("RPA timeout set to {:?}", timeout);
                } else {
                    warn!("set RPA timeout failed: {:?}", status);
                }
            }
            Pending::GenerateRpa { .. } | Pending::Resolve { .. } | Pending::ListAction(_) => {}
        }
    }

    /// Update the mirror after a successful resolving list action
    fn apply(&mut self, action: ResolvingListAction) {
        match action {
            ResolvingListAction::Add {
                peer_address_type,
                peer_identity_address,
            } => {
                let entry = ListEntry {
                    peer_address_type,
                    peer_identity_address,
                    privacy_mode: PrivacyMode::NETWORK,
                };
                if self.entries.push(entry).is_err() {
                    error!("resolving list mirror overflow");
                    return;
                }
                let privacy_mode = self.config.default_privacy_mode;
                if privacy_mode != PrivacyMode::NETWORK && self.lifecycle == Lifecycle::Running {
                    let command = HciCommand::LeSetPrivacyMode {
                        peer_address_type,
                        peer_identity_address,
                        privacy_mode,
                    };
                    let pending = Pending::DefaultPrivacyMode {
                        peer_address_type,
                        peer_identity_address,
                        privacy_mode,
                    };
                    if let Err(e) = self.submit(command, pending) {
                        warn!("default privacy mode not submitted: {}", e);
                    }
                }
            }
            ResolvingListAction::Remove {
                peer_address_type,
                peer_identity_address,
            } => {
                self.entries
                    .retain(|e| !e.matches(peer_address_type, &peer_identity_address));
            }
            ResolvingListAction::Clear => self.entries.clear(),
            ResolvingListAction::SetPrivacyMode {
                peer_address_type,
                peer_identity_address,
                privacy_mode,
            } => self.set_entry_mode(peer_address_type, &peer_identity_address, privacy_mode),
        }
    }

    fn set_entry_mode(
        &mut self,
        peer_address_type: PeerAddressType,
        address: &Address,
        privacy_mode: PrivacyMode,
    ) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.matches(peer_address_type, address))
        {
            entry.privacy_mode = privacy_mode;
        }
    }

    fn emit(&self, deliver: impl FnOnce(&dyn EventHandler)) {
        match self.handler {
            Some(handler) => deliver(handler),
            None => debug!("no event handler registered, dropping completion"),
        }
    }

    fn submit(&mut self, command: HciCommand, request: Pending) -> Result<(), PrivacyError> {
        let opcode = command.opcode();
        let outstanding = Outstanding {
            request,
            discarded: false,
        };
        if self.pending.push(outstanding).is_err() {
            warn!("too many outstanding requests, rejecting {:#x}", opcode);
            return Err(PrivacyError::Busy);
        }
        if self.link.send_command(&command).is_err() {
            self.pending.pop();
            warn!("link layer rejected command {:#x}", opcode);
            return Err(PrivacyError::LinkLayer);
        }
        debug!("submitted command {:#x}", opcode);
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), PrivacyError> {
        match self.lifecycle {
            Lifecycle::Running => Ok(()),
            _ => Err(PrivacyError::NotInitialized),
        }
    }

    fn ensure_ll_privacy(&self) -> Result<(), PrivacyError> {
        self.ensure_running()?;
        if !self.link.supports_ll_privacy() {
            return Err(PrivacyError::Unsupported);
        }
        Ok(())
    }

    /// The resolving list may only change while resolution is off or the radio is idle
    fn ensure_list_mutable(&self) -> Result<(), PrivacyError> {
        self.ensure_ll_privacy()?;
        if self.address_resolution_enabled && self.link.is_radio_active() {
            return Err(PrivacyError::RadioActive);
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        usize::from(self.link.resolving_list_size()).min(MAX_RESOLVING_LIST_SIZE)
    }

    fn pending_adds(&self) -> usize {
        self.pending
            .iter()
            .filter(|o| {
                matches!(
                    o.request,
                    Pending::ListAction(ResolvingListAction::Add { .. })
                )
            })
            .count()
    }

    /// Listed, or about to be
    fn is_listed(&self, peer_address_type: PeerAddressType, address: &Address) -> bool {
        self.entries
            .iter()
            .any(|e| e.matches(peer_address_type, address))
            || self
                .pending
                .iter()
                .any(|o| o.request.is_add_of(peer_address_type, address))
    }

    fn random_prand(&mut self) -> Option<[u8; RPA_PART_LEN]> {
        for _ in 0..RANDOM_ATTEMPTS {
            let mut random = [0u8; RPA_PART_LEN];
            self.rng.try_fill_bytes(&mut random).ok()?;
            if let Some(prand) = crypto::make_prand(random) {
                return Some(prand);
            }
        }
        None
    }
}

impl<'h, L: LinkLayer, R: RngCore> PrivateAddressController<'h> for Controller<'h, L, R> {
    fn initialize(&mut self) -> Result<(), PrivacyError> {
        if self.lifecycle == Lifecycle::Running {
            return Ok(());
        }

        let previous = self.lifecycle;
        let outstanding = self.pending.len();
        self.lifecycle = Lifecycle::Running;
        let ll_privacy = self.link.supports_ll_privacy();
        info!("privacy controller initialized, LL privacy: {}", ll_privacy);

        if ll_privacy {
            let timeout = self.config.rpa_timeout;
            let mut result = self.submit(
                HciCommand::LeSetResolvablePrivateAddressTimeout { timeout },
                Pending::RpaTimeout(timeout),
            );
            if result.is_ok() && self.config.enable_address_resolution {
                result = self.submit(
                    HciCommand::LeSetAddressResolutionEnable { enable: true },
                    Pending::AddressResolution(true),
                );
            }
            if let Err(e) = result {
                error!("failed to apply privacy config: {}", e);
                self.pending.truncate(outstanding);
                self.lifecycle = previous;
                return Err(e);
            }
        }
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), PrivacyError> {
        if self.lifecycle != Lifecycle::Running {
            return Ok(());
        }
        let mut live = 0;
        for outstanding in self.pending.iter_mut().filter(|o| !o.discarded) {
            outstanding.discarded = true;
            live += 1;
        }
        if live > 0 {
            warn!("terminating with {} requests outstanding", live);
        }
        self.lifecycle = Lifecycle::Terminated;
        info!("privacy controller terminated");
        Ok(())
    }

    fn generate_resolvable_private_address(&mut self, local_irk: &Irk) -> Result<(), PrivacyError> {
        self.ensure_running()?;
        if local_irk.is_zero() {
            return Err(PrivacyError::InvalidParameter);
        }
        if self.generating_rpa() {
            return Err(PrivacyError::Busy);
        }

        let Some(prand) = self.random_prand() else {
            warn!("no randomness for RPA generation");
            return Err(PrivacyError::RandomUnavailable);
        };
        self.submit(
            HciCommand::LeEncrypt {
                key: *local_irk.as_bytes(),
                plaintext: crypto::prand_block(prand),
            },
            Pending::GenerateRpa { prand },
        )
    }

    fn generate_non_resolvable_private_address(&mut self) -> Address {
        if self.lifecycle != Lifecycle::Running {
            warn!("NRPA requested while not running");
            return Address::INVALID;
        }
        for _ in 0..RANDOM_ATTEMPTS {
            let mut random = [0u8; 6];
            if self.rng.try_fill_bytes(&mut random).is_err() {
                warn!("no randomness for NRPA generation");
                return Address::INVALID;
            }
            if let Some(address) = crypto::make_nrpa(random) {
                return address;
            }
        }
        Address::INVALID
    }

    #[cfg(feature = "host-resolution")]
    fn resolve_private_address(&mut self, address: &Address, irk: &Irk) -> Result<(), PrivacyError> {
        self.ensure_running()?;
        if !address.is_resolvable() {
            return Err(PrivacyError::InvalidParameter);
        }
        if self.resolving_rpa() {
            return Err(PrivacyError::Busy);
        }

        self.submit(
            HciCommand::LeEncrypt {
                key: *irk.as_bytes(),
                plaintext: crypto::prand_block(address.rpa_prand()),
            },
            Pending::Resolve { address: *address },
        )
    }

    fn is_ll_privacy_supported(&self) -> bool {
        self.link.supports_ll_privacy()
    }

    fn set_ll_address_resolution(&mut self, enable: bool) -> Result<(), PrivacyError> {
        self.ensure_ll_privacy()?;
        if self.link.is_radio_active() {
            return Err(PrivacyError::RadioActive);
        }
        self.submit(
            HciCommand::LeSetAddressResolutionEnable { enable },
            Pending::AddressResolution(enable),
        )
    }

    fn set_ll_resolvable_private_address_timeout(
        &mut self,
        timeout: ResolvableAddressTimeout,
    ) -> Result<(), PrivacyError> {
        self.ensure_ll_privacy()?;
        self.submit(
            HciCommand::LeSetResolvablePrivateAddressTimeout { timeout },
            Pending::RpaTimeout(timeout),
        )
    }

    fn read_resolving_list_capacity(&self) -> u8 {
        if !self.link.supports_ll_privacy() {
            return 0;
        }
        // capacity() is at most MAX_RESOLVING_LIST_SIZE
        self.capacity() as u8
    }

    fn add_device_to_resolving_list(
        &mut self,
        peer_address_type: PeerAddressType,
        peer_identity_address: &Address,
        peer_irk: &Irk,
        local_irk: &Irk,
    ) -> Result<(), PrivacyError> {
        self.ensure_list_mutable()?;
        if peer_identity_address.is_invalid() {
            return Err(PrivacyError::InvalidParameter);
        }
        if self.is_listed(peer_address_type, peer_identity_address) {
            return Err(PrivacyError::DuplicateEntry);
        }
        if self.entries.len() + self.pending_adds() >= self.capacity() {
            return Err(PrivacyError::ResolvingListFull);
        }

        self.submit(
            HciCommand::LeAddDeviceToResolvingList {
                peer_address_type,
                peer_identity_address: *peer_identity_address,
                peer_irk: *peer_irk,
                local_irk: *local_irk,
            },
            Pending::ListAction(ResolvingListAction::Add {
                peer_address_type,
                peer_identity_address: *peer_identity_address,
            }),
        )
    }

    fn remove_device_from_resolving_list(
        &mut self,
        peer_address_type: PeerAddressType,
        peer_identity_address: &Address,
    ) -> Result<(), PrivacyError> {
        self.ensure_list_mutable()?;
        if !self.is_listed(peer_address_type, peer_identity_address) {
            return Err(PrivacyError::UnknownEntry);
        }

        self.submit(
            HciCommand::LeRemoveDeviceFromResolvingList {
                peer_address_type,
                peer_identity_address: *peer_identity_address,
            },
            Pending::ListAction(ResolvingListAction::Remove {
                peer_address_type,
                peer_identity_address: *peer_identity_address,
            }),
        )
    }

    fn clear_resolving_list(&mut self) -> Result<(), PrivacyError> {
        self.ensure_list_mutable()?;
        self.submit(
            HciCommand::LeClearResolvingList,
            Pending::ListAction(ResolvingListAction::Clear),
        )
    }

    fn set_peer_privacy_mode(
        &mut self,
        peer_address_type: PeerAddressType,
        peer_address: &Address,
        privacy_mode: PrivacyMode,
    ) -> Result<(), PrivacyError> {
        self.ensure_list_mutable()?;
        if !self.is_listed(peer_address_type, peer_address) {
            return Err(PrivacyError::UnknownEntry);
        }

        self.submit(
            HciCommand::LeSetPrivacyMode {
                peer_address_type,
                peer_identity_address: *peer_address,
                privacy_mode,
            },
            Pending::ListAction(ResolvingListAction::SetPrivacyMode {
                peer_address_type,
                peer_identity_address: *peer_address,
                privacy_mode,
            }),
        )
    }

    fn set_event_handler(&mut self, handler: Option<&'h dyn EventHandler>) {
        self.handler = handler;
    }
}
