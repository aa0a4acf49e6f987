// Messaging - change notifications and MIDI traffic between threads

pub mod channels;
pub mod notification;

pub use channels::{
    MidiConsumer, MidiProducer, NotificationConsumer, NotificationProducer,
    create_midi_channel, create_notification_channel,
};
pub use notification::{Notification, TimelineChange};
