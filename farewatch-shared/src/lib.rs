pub mod pii;

pub mod models {
    pub mod events;
}

pub use pii::Masked;
