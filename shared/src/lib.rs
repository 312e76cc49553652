//! Types and pure logic shared between the race-room client core and its
//! test harnesses: the room data model, the push-channel protocol, the race
//! state machine, and the progress/WPM math.

pub mod clock;
pub mod fsm;
pub mod model;
pub mod passages;
pub mod protocol;
pub mod wpm;
