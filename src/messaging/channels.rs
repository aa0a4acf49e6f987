// Lock-free communication channels

use crate::messaging::notification::Notification;
use crate::midi::event::MidiEventTimed;
use ringbuf::{HeapRb, traits::Split};

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

pub type MidiProducer = ringbuf::HeapProd<MidiEventTimed>;
pub type MidiConsumer = ringbuf::HeapCons<MidiEventTimed>;

pub fn create_midi_channel(capacity: usize) -> (MidiProducer, MidiConsumer) {
    let rb = HeapRb::<MidiEventTimed>::new(capacity);
    rb.split()
}
