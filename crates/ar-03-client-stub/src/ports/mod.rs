pub mod outbound;

pub use outbound::BrokerTransport;
