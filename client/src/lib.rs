//! Client core for multiplayer typing races.
//!
//! One [`RoomSession`] is the unit of everything: it fetches the room over
//! REST, joins it on the push channel, keeps a last-writer-wins
//! [`store::RoomStore`] fed from both sources, and runs the race lifecycle
//! (waiting, countdown, in-progress, completed) on a single coordinator
//! task. The backend is the source of truth; this crate is a cache with
//! timers.
//!
//! ```rust,ignore
//! let cfg = ClientConfig::default();
//! let mut session = RoomSession::join(&cfg, "room-1", me, false).await?;
//! let mut views = session.subscribe();
//!
//! session.start_race();
//! while let Some(notice) = session.next_notice().await {
//!     match notice {
//!         Notice::Finished { position, .. } => println!("placed {position}"),
//!         Notice::RaceOver | Notice::RoomClosed => break,
//!         _ => {}
//!     }
//! }
//! ```

pub mod api;
pub mod bridge;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod reconciler;
pub mod store;
pub mod timer;

pub use api::ApiClient;
pub use bridge::RealtimeBridge;
pub use config::ClientConfig;
pub use coordinator::{Command, Notice, Role, RoomSession};
pub use error::{ClientError, Result};
pub use store::{RoomPatch, RoomStore, RoomView};
