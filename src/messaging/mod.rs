// Messaging - lock-free channels between control code, the audio thread and the user

pub mod channels;
pub mod command;
pub mod notification;

pub use channels::{
    CommandConsumer, CommandProducer, NotificationConsumer, NotificationProducer, SilenceSignal,
    create_notification_channel, create_trigger_channel,
};
pub use command::AudioCommand;
pub use notification::{Notification, NotificationCategory, NotificationLevel, Notify};
