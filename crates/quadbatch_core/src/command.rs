//! Render command mini-language
//!
//! A frame arrives as ASCII text: one opcode letter followed by
//! comma-separated numbers, terminated by `;`.
//!
//! ```text
//! v;l10,20;k2,2;a0.5;d1,0,0,16,16,0,0,32,32;e;
//! ```
//!
//! Only the first character of an instruction selects the command, so a
//! longer name that shares a leading letter is read as that command. Parsing
//! never fails: unknown opcodes are skipped to the next `;`, unreadable
//! numbers read as `0`, missing arguments default to `0` and a missing final
//! `;` is implied by the end of the buffer.

use crate::quad::Clip;
use crate::transform::Transform;

/// One decoded instruction
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// `t` - replace the current transform
    SetTransform(Transform),
    /// `f` - compose onto the current transform
    Transform(Transform),
    /// `m` - reset to identity
    ResetTransform,
    /// `k` - compose a scale
    Scale { sx: f32, sy: f32 },
    /// `r` - compose a rotation in radians
    Rotate { angle: f32 },
    /// `l` - compose a translation
    Translate { x: f32, y: f32 },
    /// `v` - push the current transform
    Save,
    /// `e` - pop the last saved transform
    Restore,
    /// `a` - global alpha in `0.0..=1.0`
    GlobalAlpha(f32),
    /// `d` - draw a textured quad
    DrawImage(Clip),
    /// Any other opcode; its arguments were skipped
    Unknown(u8),
}

impl Command {
    /// The transform this command composes onto (or replaces) the current one.
    pub fn as_transform(&self) -> Option<Transform> {
        match *self {
            Command::SetTransform(t) | Command::Transform(t) => Some(t),
            Command::Scale { sx, sy } => Some(Transform::scale(sx, sy)),
            Command::Rotate { angle } => Some(Transform::rotation(angle)),
            Command::Translate { x, y } => Some(Transform::translation(x, y)),
            _ => None,
        }
    }
}

/// Streaming parser over a command buffer
pub struct CommandParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> CommandParser<'a> {
    pub fn new(commands: &'a str) -> Self {
        Self::from_bytes(commands.as_bytes())
    }

    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Byte offset of the next unread instruction
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Current byte, treating a NUL as the end of the buffer.
    fn peek(&self) -> Option<u8> {
        match self.bytes.get(self.pos) {
            Some(0) | None => None,
            Some(&b) => Some(b),
        }
    }

    /// Next argument of the current instruction, or `None` at `;`/end.
    fn next_token(&mut self) -> Option<&'a [u8]> {
        match self.peek() {
            None | Some(b';') => return None,
            Some(_) => {}
        }
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b',' || b == b';' {
                break;
            }
            self.pos += 1;
        }
        let token = &self.bytes[start..self.pos];
        if self.peek() == Some(b',') {
            self.pos += 1;
        }
        Some(token)
    }

    /// Skip surplus arguments and consume the terminating `;` if present.
    fn finish_statement(&mut self) {
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b';' {
                break;
            }
        }
    }

    fn read_floats<const N: usize>(&mut self) -> [f32; N] {
        let mut out = [0.0; N];
        for slot in out.iter_mut() {
            match self.next_token() {
                Some(token) => *slot = parse_float(token),
                None => break,
            }
        }
        self.finish_statement();
        out
    }

    fn read_clip(&mut self) -> Clip {
        let texture_id = self.next_token().map(parse_int).unwrap_or(0);
        let [cx, cy, cw, ch, px, py, pw, ph] = self.read_floats::<8>();
        Clip {
            texture_id,
            cx,
            cy,
            cw,
            ch,
            px,
            py,
            pw,
            ph,
        }
    }
}

impl Iterator for CommandParser<'_> {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        let op = self.peek()?;
        self.pos += 1;

        let command = match op {
            b't' => Command::SetTransform(Transform::from_array(self.read_floats::<6>())),
            b'f' => Command::Transform(Transform::from_array(self.read_floats::<6>())),
            b'm' => {
                self.finish_statement();
                Command::ResetTransform
            }
            b'k' => {
                let [sx, sy] = self.read_floats::<2>();
                Command::Scale { sx, sy }
            }
            b'r' => {
                let [angle] = self.read_floats::<1>();
                Command::Rotate { angle }
            }
            b'l' => {
                let [x, y] = self.read_floats::<2>();
                Command::Translate { x, y }
            }
            b'v' => {
                self.finish_statement();
                Command::Save
            }
            b'e' => {
                self.finish_statement();
                Command::Restore
            }
            b'a' => {
                let [alpha] = self.read_floats::<1>();
                Command::GlobalAlpha(alpha)
            }
            b'd' => Command::DrawImage(self.read_clip()),
            other => {
                // `;` on its own is an empty instruction, not an opcode.
                if other != b';' {
                    self.finish_statement();
                }
                Command::Unknown(other)
            }
        };
        Some(command)
    }
}

/// Length of the longest prefix of `s` that looks like a decimal float.
fn float_prefix_len(s: &[u8]) -> usize {
    let mut i = 0;
    if matches!(s.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while s.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut digits = i - int_start;
    if s.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while s.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            i = j;
        }
    }
    if digits == 0 {
        return 0;
    }
    if matches!(s.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(s.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while s.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

fn trim_leading_whitespace(token: &[u8]) -> &[u8] {
    let start = token
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(token.len());
    &token[start..]
}

/// Permissive float parse: the longest numeric prefix, or `0.0`.
pub fn parse_float(token: &[u8]) -> f32 {
    let token = trim_leading_whitespace(token);
    let len = float_prefix_len(token);
    std::str::from_utf8(&token[..len])
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .map(|v| v as f32)
        .unwrap_or(0.0)
}

/// Permissive integer parse: optional sign then digits, saturating to `i32`.
pub fn parse_int(token: &[u8]) -> i32 {
    let token = trim_leading_whitespace(token);
    let (negative, digits) = match token.first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    let mut value: i64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }
    if negative {
        value = -value;
    }
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<Command> {
        CommandParser::new(input).collect()
    }

    #[test]
    fn parses_every_opcode() {
        let commands = parse("t1,2,3,4,5,6;f1,0,0,1,7,8;m;k2,3;r0.5;l4,5;v;e;a0.25;d3,1,2,3,4,5,6,7,8;");
        assert_eq!(
            commands,
            vec![
                Command::SetTransform(Transform::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0)),
                Command::Transform(Transform::new(1.0, 0.0, 0.0, 1.0, 7.0, 8.0)),
                Command::ResetTransform,
                Command::Scale { sx: 2.0, sy: 3.0 },
                Command::Rotate { angle: 0.5 },
                Command::Translate { x: 4.0, y: 5.0 },
                Command::Save,
                Command::Restore,
                Command::GlobalAlpha(0.25),
                Command::DrawImage(Clip {
                    texture_id: 3,
                    cx: 1.0,
                    cy: 2.0,
                    cw: 3.0,
                    ch: 4.0,
                    px: 5.0,
                    py: 6.0,
                    pw: 7.0,
                    ph: 8.0,
                }),
            ]
        );
    }

    #[test]
    fn unknown_opcode_skips_to_terminator() {
        let commands = parse("x1,2,3;l1,2;");
        assert_eq!(
            commands,
            vec![Command::Unknown(b'x'), Command::Translate { x: 1.0, y: 2.0 }]
        );
    }

    #[test]
    fn dispatch_uses_first_character_only() {
        // "lerp" is read as a translate whose first argument is garbage.
        let commands = parse("lerp,4;");
        assert_eq!(commands, vec![Command::Translate { x: 0.0, y: 4.0 }]);
    }

    #[test]
    fn missing_terminator_ends_at_buffer_end() {
        let commands = parse("l3,4");
        assert_eq!(commands, vec![Command::Translate { x: 3.0, y: 4.0 }]);
    }

    #[test]
    fn missing_arguments_default_to_zero() {
        let commands = parse("k2;d7;");
        assert_eq!(commands[0], Command::Scale { sx: 2.0, sy: 0.0 });
        match commands[1] {
            Command::DrawImage(clip) => {
                assert_eq!(clip.texture_id, 7);
                assert_eq!(clip.pw, 0.0);
            }
            ref other => panic!("expected draw, got {other:?}"),
        }
    }

    #[test]
    fn surplus_arguments_are_skipped() {
        let commands = parse("l1,2,3,4;m;");
        assert_eq!(
            commands,
            vec![Command::Translate { x: 1.0, y: 2.0 }, Command::ResetTransform]
        );
    }

    #[test]
    fn invalid_numbers_read_as_zero() {
        let commands = parse("lfoo,12px;");
        assert_eq!(commands, vec![Command::Translate { x: 0.0, y: 12.0 }]);
    }

    #[test]
    fn whitespace_between_instructions_is_ignored() {
        let commands = parse("v; k2,2; e;");
        assert_eq!(
            commands,
            vec![Command::Save, Command::Scale { sx: 2.0, sy: 2.0 }, Command::Restore]
        );
    }

    #[test]
    fn nul_ends_the_stream() {
        let commands: Vec<_> = CommandParser::from_bytes(b"m;\0l1,2;").collect();
        assert_eq!(commands, vec![Command::ResetTransform]);
    }

    #[test]
    fn empty_instruction_is_unknown() {
        assert_eq!(parse(";;"), vec![Command::Unknown(b';'), Command::Unknown(b';')]);
    }

    #[test]
    fn float_prefix_parsing() {
        assert_eq!(parse_float(b"1.5"), 1.5);
        assert_eq!(parse_float(b"-2"), -2.0);
        assert_eq!(parse_float(b" 3.25abc"), 3.25);
        assert_eq!(parse_float(b".5"), 0.5);
        assert_eq!(parse_float(b"5."), 5.0);
        assert_eq!(parse_float(b"1e2"), 100.0);
        assert_eq!(parse_float(b"1e"), 1.0);
        assert_eq!(parse_float(b"abc"), 0.0);
        assert_eq!(parse_float(b"-"), 0.0);
        assert_eq!(parse_float(b""), 0.0);
    }

    #[test]
    fn int_prefix_parsing() {
        assert_eq!(parse_int(b"42"), 42);
        assert_eq!(parse_int(b"-7"), -7);
        assert_eq!(parse_int(b"3.9"), 3);
        assert_eq!(parse_int(b"x"), 0);
        assert_eq!(parse_int(b"99999999999"), i32::MAX);
    }

    #[test]
    fn transform_of_command() {
        assert_eq!(
            Command::Scale { sx: 2.0, sy: 4.0 }.as_transform(),
            Some(Transform::scale(2.0, 4.0))
        );
        assert_eq!(Command::Save.as_transform(), None);
    }
}
