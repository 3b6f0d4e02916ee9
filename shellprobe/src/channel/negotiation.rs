//! Telnet option negotiation filter.
//!
//! The probe never agrees to any telnet option. Every `DO` is answered with
//! `WONT` and every `WILL` with `DONT`; everything else in a control sequence
//! is swallowed so prompt matching only ever sees application text.
//!
//! The filter is a byte-at-a-time state machine so each transition and each
//! reply can be tested without a connection.

/// Interpret As Command: the next byte is a command.
pub const IAC: u8 = 0xFF;
/// Peer offers to enable an option.
pub const WILL: u8 = 0xFB;
/// Peer refuses or withdraws an option.
pub const WONT: u8 = 0xFC;
/// Peer asks us to enable an option.
pub const DO: u8 = 0xFD;
/// Peer forbids an option.
pub const DONT: u8 = 0xFE;
/// Subnegotiation begin.
pub const SB: u8 = 0xFA;
/// Subnegotiation end.
pub const SE: u8 = 0xF0;

/// What the filter made of one incoming byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filtered {
    /// Application data to pass on.
    Data(u8),

    /// The byte completed a sequence that must be answered; the reply goes
    /// to the peer before anything else is read.
    Reply([u8; 3]),

    /// The byte belongs to a control sequence and produces nothing.
    Consumed,
}

/// Policy applied to the raw stream before prompt matching.
pub trait StreamFilter: Send {
    /// Feed the next raw byte.
    fn feed(&mut self, byte: u8) -> Filtered;

    /// Whether the filter is partway through a control sequence.
    fn in_sequence(&self) -> bool {
        false
    }
}

/// Where the refuser is within a control sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NegotiationState {
    /// Outside any control sequence.
    #[default]
    Normal,

    /// Saw `IAC`, waiting for the command byte.
    AfterEscape,

    /// Saw `IAC <cmd>` for an option command, waiting for the option byte.
    AfterCommand(u8),

    /// Inside `IAC SB ...`, discarding until `IAC SE`.
    InSubnegotiation,

    /// Inside a subnegotiation and the last byte was `IAC`.
    SubnegotiationEscape,
}

/// Refuses every option the peer offers or requests.
#[derive(Debug, Clone, Default)]
pub struct OptionRefuser {
    state: NegotiationState,
}

impl OptionRefuser {
    /// Create a refuser outside any control sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of the machine.
    pub fn state(&self) -> NegotiationState {
        self.state
    }
}

impl StreamFilter for OptionRefuser {
    fn feed(&mut self, byte: u8) -> Filtered {
        use NegotiationState::*;

        let (next, out) = match self.state {
            Normal if byte == IAC => (AfterEscape, Filtered::Consumed),
            Normal => (Normal, Filtered::Data(byte)),

            AfterEscape => match byte {
                DO | WILL | WONT | DONT => (AfterCommand(byte), Filtered::Consumed),
                SB => (InSubnegotiation, Filtered::Consumed),
                // Any other command is a two byte sequence.
                _ => (Normal, Filtered::Consumed),
            },

            AfterCommand(DO) => (Normal, Filtered::Reply([IAC, WONT, byte])),
            AfterCommand(WILL) => (Normal, Filtered::Reply([IAC, DONT, byte])),
            AfterCommand(_) => (Normal, Filtered::Consumed),

            InSubnegotiation if byte == IAC => (SubnegotiationEscape, Filtered::Consumed),
            InSubnegotiation => (InSubnegotiation, Filtered::Consumed),

            // Doubled IAC inside subnegotiation data is not unescaped: an
            // IAC IAC SE run still terminates the block.
            SubnegotiationEscape => match byte {
                SE => (Normal, Filtered::Consumed),
                IAC => (SubnegotiationEscape, Filtered::Consumed),
                _ => (InSubnegotiation, Filtered::Consumed),
            },
        };

        self.state = next;
        out
    }

    fn in_sequence(&self) -> bool {
        self.state != NegotiationState::Normal
    }
}
