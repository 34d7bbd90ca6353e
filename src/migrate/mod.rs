// Online table migration core: change capture and replay, index rewriting,
// storage swap
pub mod session;
pub mod statements;
pub mod capture;
pub mod replay;
pub mod rewrite;
pub mod shadow;
pub mod toast;
pub mod swap;

pub use session::Session;
pub use statements::{MigrationStatements, ReplayStatements};
pub use capture::{CaptureTrigger, TriggerEvent, TriggerLevel, TriggerOp, TriggerTiming};
pub use replay::ReplayExecutor;
pub use rewrite::{IndexRewriter, NameToken};
pub use shadow::ShadowMap;
pub use toast::{RotationState, ToastLayout, ToastPair, ToastRotation};
pub use swap::SwapExecutor;
