use rust_fsm::*;

use crate::model::RoomStatus;

/// Inputs that drive a room through its lifecycle. The creator's start
/// action is the only way out of `Waiting`; `Completed` is terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RaceInput {
    /// Creator issued a start, server began the countdown.
    CountdownStarted,
    /// Countdown hit zero, or the server signalled the race start directly.
    CountdownFinished,
    /// The race timer ran out.
    TimeExpired,
    /// Creator ended the race early.
    RaceEnded,
}

impl StateMachineImpl for RoomStatus {
    type Input = RaceInput;
    type State = RoomStatus;
    type Output = ();
    const INITIAL_STATE: Self::State = RoomStatus::Waiting;

    fn transition(state: &Self::State, input: &Self::Input) -> Option<Self::State> {
        match (state, input) {
            (RoomStatus::Waiting, RaceInput::CountdownStarted) => Some(RoomStatus::Countdown),
            (RoomStatus::Countdown, RaceInput::CountdownFinished) => Some(RoomStatus::InProgress),
            (RoomStatus::InProgress, RaceInput::TimeExpired)
            | (RoomStatus::InProgress, RaceInput::RaceEnded) => Some(RoomStatus::Completed),
            _ => None,
        }
    }

    fn output(_state: &Self::State, _input: &Self::Input) -> Option<Self::Output> {
        None
    }
}

/// Convenience wrapper over the transition table.
pub fn next_status(current: RoomStatus, input: &RaceInput) -> Option<RoomStatus> {
    RoomStatus::transition(&current, input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_INPUTS: [RaceInput; 4] = [
        RaceInput::CountdownStarted,
        RaceInput::CountdownFinished,
        RaceInput::TimeExpired,
        RaceInput::RaceEnded,
    ];

    #[test]
    fn waiting_only_leaves_on_start() {
        for input in &ALL_INPUTS {
            let next = next_status(RoomStatus::Waiting, input);
            if *input == RaceInput::CountdownStarted {
                assert_eq!(next, Some(RoomStatus::Countdown));
            } else {
                assert_eq!(next, None);
            }
        }
    }

    #[test]
    fn full_lifecycle() {
        let s = next_status(RoomStatus::Waiting, &RaceInput::CountdownStarted).unwrap();
        let s = next_status(s, &RaceInput::CountdownFinished).unwrap();
        assert_eq!(s, RoomStatus::InProgress);
        assert_eq!(
            next_status(s, &RaceInput::TimeExpired),
            Some(RoomStatus::Completed)
        );
        assert_eq!(
            next_status(s, &RaceInput::RaceEnded),
            Some(RoomStatus::Completed)
        );
    }

    #[test]
    fn completed_is_terminal() {
        for input in &ALL_INPUTS {
            assert_eq!(next_status(RoomStatus::Completed, input), None);
        }
    }

    #[test]
    fn no_state_skipping() {
        assert_eq!(
            next_status(RoomStatus::Waiting, &RaceInput::CountdownFinished),
            None
        );
        assert_eq!(
            next_status(RoomStatus::Countdown, &RaceInput::TimeExpired),
            None
        );
    }
}
