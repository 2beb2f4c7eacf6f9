pub mod components;
pub mod error;
pub mod loader;

pub use components::{
    CatalogSettings, ConnectSettings, ControlPlaneConfig, DatabaseSettings, KafkaSettings,
    MetricsSettings, StatusSettings,
};
