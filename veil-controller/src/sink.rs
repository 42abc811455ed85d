//! Event handler that forwards completions to an embassy channel
//!
//! Lets a GAP task await completions instead of handling callbacks in the
//! event-processing context.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use veil_core::Address;
use veil_hal::{EventHandler, PrivacyEvent, ResolvingListCompletion};

use crate::controller::MAX_PENDING_REQUESTS;

/// Channel capacity for privacy events
///
/// Each outstanding request reports at most once, so a channel drained
/// after every dispatch never overflows.
pub const PRIVACY_EVENT_CHANNEL_SIZE: usize = MAX_PENDING_REQUESTS;

/// Channel sized for one event per outstanding request
pub type PrivacyEventChannel<M> = Channel<M, PrivacyEvent, PRIVACY_EVENT_CHANNEL_SIZE>;

/// [`EventHandler`] pushing every completion into a [`Channel`]
///
/// Delivery never blocks. When the channel is full the event is dropped
/// and a warning logged.
pub struct ChannelEventSink<'c, M: RawMutex, const N: usize> {
    channel: &'c Channel<M, PrivacyEvent, N>,
}

impl<'c, M: RawMutex, const N: usize> ChannelEventSink<'c, M, N> {
    pub const fn new(channel: &'c Channel<M, PrivacyEvent, N>) -> Self {
        Self { channel }
    }

    fn forward(&self, event: PrivacyEvent) {
        if let Err(TrySendError::Full(event)) = self.channel.try_send(event) {
            warn!("privacy event channel full, dropping {:?}", event);
        }
    }
}

impl<M: RawMutex, const N: usize> EventHandler for ChannelEventSink<'_, M, N> {
    fn on_resolvable_private_address_generated(&self, address: &Address) {
        self.forward(PrivacyEvent::ResolvablePrivateAddressGenerated(*address));
    }

    fn on_private_address_resolved(&self, resolved: bool) {
        self.forward(PrivacyEvent::PrivateAddressResolved(resolved));
    }

    fn on_resolving_list_action_complete(&self, completion: &ResolvingListCompletion) {
        self.forward(PrivacyEvent::ResolvingListActionComplete(*completion));
    }
}
