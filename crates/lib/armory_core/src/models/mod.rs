//! Wire and storage models shared by the client and its callers.

pub mod auth;
pub mod inventory;

pub use auth::{
    Credential, PhotoUploadResponse, QrLoginRequest, RefreshRequest, RefreshResponse,
    RegisterRequest, Session, UserProfile,
};
pub use inventory::{
    ActionReceipt, InventoryItem, ItemAction, ItemActionRequest, ItemStatus, TransactionLog,
};
