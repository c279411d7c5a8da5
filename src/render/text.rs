/*
 *  render/text.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Line fitting for fixed width character panels
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::mpdinfo::Song;

/// Centre `text` in `width` columns; longer text is returned unchanged.
pub fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let pad = width - len;
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(pad - left))
}

/// Pad `text` on the right to `width` columns, never truncating
pub fn fit_left(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

/// `TITLE / ALBUM #NN`, track zero-padded to two digits, before transliteration and case folding
pub fn title_line(song: &Song) -> String {
    format!("{} / {} #{:0>2}", song.title, song.album, song.track)
}

/// ` MM:SS` suffix drawn after the progress bar
pub fn clock_suffix(secs: u32) -> String {
    format!(" {:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_odd_padding_goes_right() {
        assert_eq!(center("PAUSED", 16), "     PAUSED     ");
        assert_eq!(center("STOPPED", 16), "    STOPPED     ");
        assert_eq!(center("A VERY LONG ARTIST NAME", 16), "A VERY LONG ARTIST NAME");
    }

    #[test]
    fn test_fit_left_pads_only() {
        assert_eq!(fit_left("ABC", 5), "ABC  ");
        assert_eq!(fit_left("ABCDEFG", 5), "ABCDEFG");
    }

    #[test]
    fn test_title_line() {
        let song = Song {
            artist: "Miles Davis".into(),
            title: "So What".into(),
            track: "1".into(),
            album: "Kind of Blue".into(),
        };
        assert_eq!(title_line(&song), "So What / Kind of Blue #01");
    }

    #[test]
    fn test_clock_suffix() {
        assert_eq!(clock_suffix(0), " 00:00");
        assert_eq!(clock_suffix(83), " 01:23");
        assert_eq!(clock_suffix(6000), " 100:00");
    }
}
