// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Linux input key code names.
//!
//! Display names for the codes reported by `kfind` and stored in
//! `script_<code>_<event>` keys. Codes missing from the table are shown as
//! `KEY_<code>`.

/// `(code, name)` pairs sorted by code.
const KEY_NAMES: &[(u32, &str)] = &[
    (1, "ESC"),
    (2, "1"),
    (3, "2"),
    (4, "3"),
    (5, "4"),
    (6, "5"),
    (7, "6"),
    (8, "7"),
    (9, "8"),
    (10, "9"),
    (11, "0"),
    (12, "-"),
    (13, "="),
    (14, "BACKSPACE"),
    (15, "TAB"),
    (16, "Q"),
    (17, "W"),
    (18, "E"),
    (19, "R"),
    (20, "T"),
    (21, "Y"),
    (22, "U"),
    (23, "I"),
    (24, "O"),
    (25, "P"),
    (26, "["),
    (27, "]"),
    (28, "ENTER"),
    (29, "LEFT_CTRL"),
    (30, "A"),
    (31, "S"),
    (32, "D"),
    (33, "F"),
    (34, "G"),
    (35, "H"),
    (36, "J"),
    (37, "K"),
    (38, "L"),
    (39, ";"),
    (40, "'"),
    (41, "`"),
    (42, "LEFT_SHIFT"),
    (43, "\\"),
    (44, "Z"),
    (45, "X"),
    (46, "C"),
    (47, "V"),
    (48, "B"),
    (49, "N"),
    (50, "M"),
    (51, ","),
    (52, "."),
    (53, "/"),
    (54, "RIGHT_SHIFT"),
    (55, "KP_ASTERISK"),
    (56, "LEFT_ALT"),
    (57, "SPACE"),
    (58, "CAPS_LOCK"),
    (59, "F1"),
    (60, "F2"),
    (61, "F3"),
    (62, "F4"),
    (63, "F5"),
    (64, "F6"),
    (65, "F7"),
    (66, "F8"),
    (67, "F9"),
    (68, "F10"),
    (69, "NUM_LOCK"),
    (70, "SCROLL_LOCK"),
    (71, "KP_7"),
    (72, "KP_8"),
    (73, "KP_9"),
    (74, "KP_MINUS"),
    (75, "KP_4"),
    (76, "KP_5"),
    (77, "KP_6"),
    (78, "KP_PLUS"),
    (79, "KP_1"),
    (80, "KP_2"),
    (81, "KP_3"),
    (82, "KP_0"),
    (83, "KP_DOT"),
    (87, "F11"),
    (88, "F12"),
    (96, "KP_ENTER"),
    (97, "RIGHT_CTRL"),
    (98, "KP_SLASH"),
    (99, "SYSRQ"),
    (100, "RIGHT_ALT"),
    (102, "HOME"),
    (103, "UP"),
    (104, "PAGE_UP"),
    (105, "LEFT"),
    (106, "RIGHT"),
    (107, "END"),
    (108, "DOWN"),
    (109, "PAGE_DOWN"),
    (110, "INSERT"),
    (111, "DELETE"),
    (113, "MUTE"),
    (114, "VOLUME_DOWN"),
    (115, "VOLUME_UP"),
    (116, "POWER"),
    (117, "KP_EQUAL"),
    (119, "PAUSE"),
    (125, "LEFT_META"),
    (126, "RIGHT_META"),
    (127, "COMPOSE"),
    (128, "STOP"),
    (129, "AGAIN"),
    (130, "PROPS"),
    (131, "UNDO"),
    (132, "FRONT"),
    (133, "COPY"),
    (134, "OPEN"),
    (135, "PASTE"),
    (136, "FIND"),
    (137, "CUT"),
    (138, "HELP"),
    (139, "MENU"),
    (140, "CALC"),
    (141, "SETUP"),
    (142, "SLEEP"),
    (143, "WAKEUP"),
    (144, "FILE"),
    (145, "SEND_FILE"),
    (146, "DELETE_FILE"),
    (147, "XFER"),
    (148, "PROG1"),
    (149, "PROG2"),
    (150, "WWW"),
    (151, "MSDOS"),
    (152, "COFFEE"),
    (153, "ROTATE_DISPLAY"),
    (154, "CYCLE_WINDOWS"),
    (155, "MAIL"),
    (156, "BOOKMARKS"),
    (157, "COMPUTER"),
    (158, "BACK"),
    (159, "FORWARD"),
    (160, "CLOSE_CD"),
    (161, "EJECT_CD"),
    (162, "EJECT_CLOSE_CD"),
    (163, "NEXT_SONG"),
    (164, "PLAY_PAUSE"),
    (165, "PREVIOUS_SONG"),
    (166, "STOP_CD"),
    (167, "RECORD"),
    (168, "REWIND"),
    (169, "PHONE"),
    (170, "ISO"),
    (171, "CONFIG"),
    (172, "HOMEPAGE"),
    (173, "REFRESH"),
    (174, "EXIT"),
    (175, "MOVE"),
    (176, "EDIT"),
    (177, "SCROLL_UP"),
    (178, "SCROLL_DOWN"),
    (179, "KP_LEFT_PAREN"),
    (180, "KP_RIGHT_PAREN"),
    (181, "NEW"),
    (182, "REDO"),
    (183, "F13"),
    (184, "F14"),
    (185, "F15"),
    (186, "F16"),
    (187, "F17"),
    (188, "F18"),
    (189, "F19"),
    (190, "F20"),
    (191, "F21"),
    (192, "F22"),
    (193, "F23"),
    (194, "F24"),
    (200, "PLAY_CD"),
    (201, "PAUSE_CD"),
    (202, "PROG3"),
    (203, "PROG4"),
    (204, "DASHBOARD"),
    (205, "SUSPEND"),
    (206, "CLOSE"),
    (207, "PLAY"),
    (208, "FAST_FORWARD"),
    (209, "BASS_BOOST"),
    (210, "PRINT"),
    (211, "HP"),
    (212, "CAMERA"),
    (213, "SOUND"),
    (214, "QUESTION"),
    (215, "EMAIL"),
    (216, "CHAT"),
    (217, "SEARCH"),
    (218, "CONNECT"),
    (219, "FINANCE"),
    (220, "SPORT"),
    (221, "SHOP"),
    (222, "ALT_ERASE"),
    (223, "CANCEL"),
    (224, "BRIGHTNESS_DOWN"),
    (225, "BRIGHTNESS_UP"),
    (226, "MEDIA"),
    (227, "SWITCH_VIDEO_MODE"),
    (228, "KBDILLUM_TOGGLE"),
    (229, "KBDILLUM_DOWN"),
    (230, "KBDILLUM_UP"),
    (231, "SEND"),
    (232, "REPLY"),
    (233, "FORWARD_MAIL"),
    (234, "SAVE"),
    (235, "DOCUMENTS"),
    (236, "BATTERY"),
    (237, "BLUETOOTH"),
    (238, "WLAN"),
    (239, "UWB"),
    (240, "UNKNOWN"),
    (241, "VIDEO_NEXT"),
    (242, "VIDEO_PREV"),
    (243, "BRIGHTNESS_CYCLE"),
    (244, "BRIGHTNESS_AUTO"),
    (245, "DISPLAY_OFF"),
    (246, "WWAN"),
    (247, "RFKILL"),
    (248, "MICMUTE"),
];

/// Looks up the name of a known key code.
pub fn key_name(code: u32) -> Option<&'static str> {
    KEY_NAMES
        .binary_search_by_key(&code, |(c, _)| *c)
        .ok()
        .map(|idx| KEY_NAMES[idx].1)
}

/// Name shown for a key code, falling back to `KEY_<code>`.
pub fn display_name(code: u32) -> String {
    key_name(code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("KEY_{}", code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        assert!(
            KEY_NAMES.windows(2).all(|w| w[0].0 < w[1].0),
            "Binary search needs a strictly ascending table"
        );
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(key_name(1), Some("ESC"));
        assert_eq!(key_name(114), Some("VOLUME_DOWN"));
        assert_eq!(key_name(115), Some("VOLUME_UP"));
        assert_eq!(key_name(116), Some("POWER"));
        assert_eq!(key_name(248), Some("MICMUTE"));
    }

    #[test]
    fn test_unknown_code_falls_back() {
        assert_eq!(key_name(735), None);
        assert_eq!(display_name(735), "KEY_735");
        assert_eq!(display_name(0), "KEY_0");
    }
}
