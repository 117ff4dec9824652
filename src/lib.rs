pub mod amount;
pub mod clock;
pub mod csv;
pub mod engine;
pub mod model;
pub mod rng;
pub mod settlement;
pub mod store;

pub use amount::Amount;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Engine, LimitEnforcement};
pub use model::{AccountId, AccountKind, Operation, TransactionRecord, TxId, UserId};
pub use rng::{FractionSource, XorShiftRng};
pub use settlement::{AllocationPolicy, Settlement, SettlementBook};
pub use store::MemoryStore;
