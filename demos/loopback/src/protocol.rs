//! Reply policy.

use clap::ValueEnum;
use std::fmt;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

/// Text sent back to every text frame in greet mode.
pub const GREETING: &str = "Hello, WebSocket!";
/// Bytes sent back to every binary frame in greet mode.
pub const BINARY_REPLY: [u8; 4] = *b"ABCD";
/// Image pairs sent for the `pngs` command.
pub const BURST_ROUNDS: usize = 10;
/// Pause between image frames of a burst.
pub const BURST_PACE: Duration = Duration::from_millis(16);

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// How the server answers data frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Send every data frame back unchanged.
    Echo,
    /// Fixed replies, plus images on request.
    Greet,
}

/// The two images served by the `png0`, `png1` and `pngs` commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Images {
    pub first: Vec<u8>,
    pub second: Vec<u8>,
}

impl Images {
    /// Stand-ins used when no image files are given: a PNG signature
    /// followed by a patterned body, 8 KiB and 16 KiB long.
    pub fn generated() -> Self {
        Self {
            first: placeholder(8 * 1024),
            second: placeholder(16 * 1024),
        }
    }
}

fn placeholder(len: usize) -> Vec<u8> {
    let mut data = PNG_SIGNATURE.to_vec();
    data.extend((PNG_SIGNATURE.len()..len).map(|i| (i % 251) as u8));
    data
}

/// Frames to send back for one inbound frame.
#[derive(Debug, Default, PartialEq)]
pub struct Reply {
    pub frames: Vec<Message>,
    /// Pause before each frame after the first.
    pub pace: Option<Duration>,
}

impl Mode {
    /// The reply to one inbound frame. Control frames get none; the
    /// protocol layer answers pings and closes on its own.
    pub fn reply(self, msg: &Message, images: &Images) -> Reply {
        match (self, msg) {
            (Mode::Echo, Message::Text(_) | Message::Binary(_)) => Reply {
                frames: vec![msg.clone()],
                pace: None,
            },
            (Mode::Greet, Message::Text(text)) => greet_text(text.as_str(), images),
            (Mode::Greet, Message::Binary(_)) => Reply {
                frames: vec![Message::Binary(BINARY_REPLY.to_vec().into())],
                pace: None,
            },
            _ => Reply::default(),
        }
    }
}

fn greet_text(text: &str, images: &Images) -> Reply {
    let mut frames = vec![Message::Text(GREETING.into())];
    let image = |data: &Vec<u8>| Message::Binary(data.clone().into());

    if text.starts_with("png0") {
        frames.push(image(&images.first));
    } else if text.starts_with("png1") {
        frames.push(image(&images.second));
    } else if text.starts_with("pngs") {
        for _ in 0..BURST_ROUNDS {
            frames.push(image(&images.first));
            frames.push(image(&images.second));
        }
        return Reply {
            frames,
            pace: Some(BURST_PACE),
        };
    }

    Reply { frames, pace: None }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Echo => f.write_str("echo"),
            Mode::Greet => f.write_str("greet"),
        }
    }
}
