#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_1: u32 = 2;
pub const KEY_2: u32 = 3;
pub const KEY_3: u32 = 4;
pub const KEY_4: u32 = 5;
pub const KEY_5: u32 = 6;
pub const KEY_6: u32 = 7;
pub const KEY_7: u32 = 8;
pub const KEY_8: u32 = 9;
pub const KEY_9: u32 = 10;
pub const KEY_0: u32 = 11;

pub const KEY_MINUS: u32 = 12;
pub const KEY_EQUAL: u32 = 13;

pub const KEY_Q: u32 = 16;
pub const KEY_W: u32 = 17;
pub const KEY_E: u32 = 18;
pub const KEY_R: u32 = 19;
pub const KEY_T: u32 = 20;
pub const KEY_Y: u32 = 21;
pub const KEY_U: u32 = 22;
pub const KEY_I: u32 = 23;
pub const KEY_O: u32 = 24;
pub const KEY_P: u32 = 25;

pub const KEY_LEFTBRACE: u32 = 26;
pub const KEY_RIGHTBRACE: u32 = 27;
pub const KEY_ENTER: u32 = 28;

pub const KEY_LEFTCTRL: u32 = 29;

pub const KEY_A: u32 = 30;
pub const KEY_S: u32 = 31;
pub const KEY_D: u32 = 32;
pub const KEY_F: u32 = 33;
pub const KEY_G: u32 = 34;
pub const KEY_H: u32 = 35;
pub const KEY_J: u32 = 36;
pub const KEY_K: u32 = 37;
pub const KEY_L: u32 = 38;

pub const KEY_SEMICOLON: u32 = 39;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_GRAVE: u32 = 41;

pub const KEY_LEFTSHIFT: u32 = 42;

pub const KEY_BACKSLASH: u32 = 43;

pub const KEY_Z: u32 = 44;
pub const KEY_X: u32 = 45;
pub const KEY_C: u32 = 46;
pub const KEY_V: u32 = 47;
pub const KEY_B: u32 = 48;
pub const KEY_N: u32 = 49;
pub const KEY_M: u32 = 50;

pub const KEY_COMMA: u32 = 51;
pub const KEY_DOT: u32 = 52;
pub const KEY_SLASH: u32 = 53;

pub const KEY_RIGHTSHIFT: u32 = 54;

pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;

pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;

// (unshifted, shifted, keycode) for every printable key on a US QWERTY board.
const US_QWERTY_ROWS: &[(char, char, u32)] = &[
    ('`', '~', KEY_GRAVE),
    ('1', '!', KEY_1),
    ('2', '@', KEY_2),
    ('3', '#', KEY_3),
    ('4', '$', KEY_4),
    ('5', '%', KEY_5),
    ('6', '^', KEY_6),
    ('7', '&', KEY_7),
    ('8', '*', KEY_8),
    ('9', '(', KEY_9),
    ('0', ')', KEY_0),
    ('-', '_', KEY_MINUS),
    ('=', '+', KEY_EQUAL),
    ('q', 'Q', KEY_Q),
    ('w', 'W', KEY_W),
    ('e', 'E', KEY_E),
    ('r', 'R', KEY_R),
    ('t', 'T', KEY_T),
    ('y', 'Y', KEY_Y),
    ('u', 'U', KEY_U),
    ('i', 'I', KEY_I),
    ('o', 'O', KEY_O),
    ('p', 'P', KEY_P),
    ('[', '{', KEY_LEFTBRACE),
    (']', '}', KEY_RIGHTBRACE),
    ('\\', '|', KEY_BACKSLASH),
    ('a', 'A', KEY_A),
    ('s', 'S', KEY_S),
    ('d', 'D', KEY_D),
    ('f', 'F', KEY_F),
    ('g', 'G', KEY_G),
    ('h', 'H', KEY_H),
    ('j', 'J', KEY_J),
    ('k', 'K', KEY_K),
    ('l', 'L', KEY_L),
    (';', ':', KEY_SEMICOLON),
    ('\'', '"', KEY_APOSTROPHE),
    ('z', 'Z', KEY_Z),
    ('x', 'X', KEY_X),
    ('c', 'C', KEY_C),
    ('v', 'V', KEY_V),
    ('b', 'B', KEY_B),
    ('n', 'N', KEY_N),
    ('m', 'M', KEY_M),
    (',', '<', KEY_COMMA),
    ('.', '>', KEY_DOT),
    ('/', '?', KEY_SLASH),
];

pub fn char_to_keystroke(c: char) -> Option<KeyStroke> {
    match c {
        ' ' => {
            return Some(KeyStroke {
                keycode: KEY_SPACE,
                shift: false,
            })
        }
        '\n' => {
            return Some(KeyStroke {
                keycode: KEY_ENTER,
                shift: false,
            })
        }
        _ => {}
    }

    US_QWERTY_ROWS.iter().find_map(|&(plain, shifted, keycode)| {
        if c == plain {
            Some(KeyStroke {
                keycode,
                shift: false,
            })
        } else if c == shifted {
            Some(KeyStroke {
                keycode,
                shift: true,
            })
        } else {
            None
        }
    })
}

/// Inverse of [`char_to_keystroke`].
pub fn keystroke_to_char(stroke: KeyStroke) -> Option<char> {
    match (stroke.keycode, stroke.shift) {
        (KEY_SPACE, _) => return Some(' '),
        (KEY_ENTER, _) => return Some('\n'),
        _ => {}
    }

    US_QWERTY_ROWS
        .iter()
        .find(|&&(_, _, keycode)| keycode == stroke.keycode)
        .map(|&(plain, shifted, _)| if stroke.shift { shifted } else { plain })
}

pub fn find_first_unsupported_char(text: &str) -> Option<(usize, char)> {
    text.char_indices()
        .find(|&(_idx, c)| char_to_keystroke(c).is_none())
}
