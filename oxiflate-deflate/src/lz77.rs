//! LZ77 match finding for DEFLATE.
//!
//! The [`MatchFinder`] owns the compressor's sliding window and hash chains.
//!
//! # Window
//!
//! The window buffer holds `2 * w_size` bytes. Input is appended after the
//! current position until the buffer is full; once the position passes
//! `w_size + max_dist`, the upper half is copied down and every stored
//! position is rebased by `w_size`.
//!
//! # Hash chains
//!
//! `head[h]` is the most recent position whose next three bytes hash to
//! `h`; `prev[pos % w_size]` links to the previous position with the same
//! hash. Position 0 doubles as the empty link, so it is never matched.

use crate::tables::{LevelConfig, MAX_MATCH, MIN_LOOKAHEAD, MIN_MATCH};

/// A token produced by LZ77 compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lz77Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data.
    Match {
        /// Number of bytes to copy (3-258).
        length: u16,
        /// Distance back into the window (1-32768).
        distance: u16,
    },
}

/// Caller input consumed by [`MatchFinder::fill_window`].
#[derive(Debug)]
pub struct Source<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Source<'a> {
    /// Wrap an input slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Whether all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    /// The consumed bytes from `start` up to the current position.
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.data[start..self.pos]
    }

    /// Copy as much input as fits into `dst`.
    fn read(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.data.len() - self.pos);
        dst[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}

/// Sliding window plus hash chains for the compressor.
#[derive(Debug, Clone)]
pub struct MatchFinder {
    /// Window size (`1 << window_bits`).
    w_size: usize,
    w_mask: usize,
    /// Logical buffer size, `2 * w_size`. The allocation carries a little
    /// slack past it so match comparisons never run off the end.
    window_size: usize,
    /// Window contents.
    pub window: Vec<u8>,
    /// Hash chain links, indexed by `pos & w_mask`.
    prev: Vec<u16>,
    /// Most recent position per hash value.
    head: Vec<u16>,
    hash_mask: usize,
    hash_shift: u32,
    /// Rolling hash of the bytes at `strstart`.
    ins_h: usize,

    /// Start of the string being examined.
    pub strstart: usize,
    /// Valid bytes at and after `strstart`.
    pub lookahead: usize,
    /// Start of the current block; negative once the window slid past it.
    pub block_start: isize,
    /// Start of the last match found.
    pub match_start: usize,
    /// Length of the current match candidate.
    pub match_length: usize,
    /// Start of the previous (held) match.
    pub prev_match: usize,
    /// Length of the previous (held) match.
    pub prev_length: usize,
    /// Whether a literal is held back for lazy evaluation.
    pub match_available: bool,
    /// Run-length matches may not reach back before this position.
    pub match_floor: usize,
}

impl MatchFinder {
    /// Create a match finder for `1 << window_bits` bytes of history and a
    /// hash table of `1 << (mem_level + 7)` entries.
    pub fn new(window_bits: u8, mem_level: u8) -> Self {
        let w_size = 1usize << window_bits;
        let hash_bits = mem_level as u32 + 7;
        let hash_size = 1usize << hash_bits;
        Self {
            w_size,
            w_mask: w_size - 1,
            window_size: 2 * w_size,
            window: vec![0; 2 * w_size + MAX_MATCH + MIN_MATCH],
            prev: vec![0; w_size],
            head: vec![0; hash_size],
            hash_mask: hash_size - 1,
            hash_shift: (hash_bits + MIN_MATCH as u32 - 1) / MIN_MATCH as u32,
            ins_h: 0,
            strstart: 0,
            lookahead: 0,
            block_start: 0,
            match_start: 0,
            match_length: MIN_MATCH - 1,
            prev_match: 0,
            prev_length: MIN_MATCH - 1,
            match_available: false,
            match_floor: 0,
        }
    }

    /// Forget all input and history.
    pub fn reset(&mut self) {
        self.clear_hash();
        self.ins_h = 0;
        self.strstart = 0;
        self.lookahead = 0;
        self.block_start = 0;
        self.match_start = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_match = 0;
        self.prev_length = MIN_MATCH - 1;
        self.match_available = false;
        self.match_floor = 0;
    }

    /// Window size in bytes.
    pub fn w_size(&self) -> usize {
        self.w_size
    }

    /// Longest distance a match may use.
    #[inline(always)]
    pub fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    /// Empty every hash chain so no later match reaches earlier data.
    pub fn clear_hash(&mut self) {
        self.head.fill(0);
    }

    /// Input bytes covered by the current block.
    #[inline]
    pub fn block_len(&self) -> usize {
        (self.strstart as isize - self.block_start) as usize
    }

    /// The current block's input, if it may be emitted as a stored block.
    ///
    /// Blocks longer than `max_dist()` are never offered, so the answer does
    /// not depend on when the window last slid.
    pub fn block_data(&self) -> Option<&[u8]> {
        if self.block_start >= 0 && self.block_len() <= self.max_dist() {
            Some(&self.window[self.block_start as usize..self.strstart])
        } else {
            None
        }
    }

    #[inline(always)]
    fn update_hash(&self, h: usize, byte: u8) -> usize {
        ((h << self.hash_shift) ^ byte as usize) & self.hash_mask
    }

    /// Reseed the rolling hash from the two bytes at `strstart`.
    #[inline]
    pub fn reseed_hash(&mut self) {
        let h = self.window[self.strstart] as usize;
        self.ins_h = self.update_hash(h, self.window[self.strstart + 1]);
    }

    /// Insert the string at `pos` into its hash chain and return the
    /// previous head of that chain (0 when empty).
    #[inline]
    pub fn insert_string(&mut self, pos: usize) -> usize {
        self.ins_h = self.update_hash(self.ins_h, self.window[pos + MIN_MATCH - 1]);
        let head = self.head[self.ins_h];
        self.prev[pos & self.w_mask] = head;
        self.head[self.ins_h] = pos as u16;
        head as usize
    }

    /// Read input until at least [`MIN_LOOKAHEAD`] bytes are buffered or the
    /// input runs out, sliding the window when the position nears its end.
    pub fn fill_window(&mut self, src: &mut Source<'_>) {
        loop {
            let mut more = self.window_size - self.lookahead - self.strstart;

            if self.strstart >= self.w_size + self.max_dist() {
                self.slide();
                more += self.w_size;
            }

            if src.is_empty() {
                return;
            }

            let start = self.strstart + self.lookahead;
            let n = src.read(&mut self.window[start..start + more]);
            self.lookahead += n;

            if self.lookahead >= MIN_MATCH {
                self.reseed_hash();
            }

            if self.lookahead >= MIN_LOOKAHEAD || src.is_empty() {
                return;
            }
        }
    }

    /// Move the upper half of the window down and rebase every position.
    fn slide(&mut self) {
        let w_size = self.w_size;
        self.window.copy_within(w_size..self.window_size, 0);
        self.match_start = self.match_start.saturating_sub(w_size);
        self.strstart -= w_size;
        self.block_start -= w_size as isize;
        self.match_floor = self.match_floor.saturating_sub(w_size);

        let rebase = |link: &mut u16| {
            *link = (*link as usize).saturating_sub(w_size) as u16;
        };
        self.head.iter_mut().for_each(rebase);
        self.prev.iter_mut().for_each(rebase);
    }

    /// Find the longest match for the string at `strstart` along the chain
    /// starting at `cur_match`.
    ///
    /// Only matches longer than `prev_length` are considered. Sets
    /// `match_start` and returns the length, capped at `lookahead`.
    pub fn longest_match(&mut self, mut cur_match: usize, config: &LevelConfig) -> usize {
        let mut chain_length = config.max_chain;
        let scan = self.strstart;
        let mut best_len = self.prev_length;
        let max_dist = self.max_dist();
        let limit = self.strstart.saturating_sub(max_dist);

        // A good match is already held: search less.
        if self.prev_length >= config.good_length {
            chain_length >>= 1;
        }
        // Never look past the end of the input.
        let nice_length = config.nice_length.min(self.lookahead);

        let window = &self.window;
        loop {
            let m = cur_match;
            if window[m + best_len] == window[scan + best_len]
                && window[m + best_len - 1] == window[scan + best_len - 1]
                && window[m] == window[scan]
                && window[m + 1] == window[scan + 1]
            {
                let len = 2 + window[m + 2..m + MAX_MATCH]
                    .iter()
                    .zip(&window[scan + 2..scan + MAX_MATCH])
                    .take_while(|(a, b)| a == b)
                    .count();

                if len > best_len {
                    self.match_start = cur_match;
                    best_len = len;
                    if len >= nice_length {
                        break;
                    }
                }
            }

            cur_match = self.prev[cur_match & self.w_mask] as usize;
            if cur_match <= limit {
                break;
            }
            chain_length -= 1;
            if chain_length == 0 {
                break;
            }
        }

        best_len.min(self.lookahead)
    }

    /// Length of the run at `strstart` that repeats the byte just before it,
    /// or 0 when it is shorter than [`MIN_MATCH`] or would reach before
    /// `match_floor`.
    pub fn run_length(&self) -> usize {
        if self.lookahead < MIN_MATCH || self.strstart <= self.match_floor {
            return 0;
        }
        let byte = self.window[self.strstart - 1];
        let limit = MAX_MATCH.min(self.lookahead);
        let len = self.window[self.strstart..self.strstart + limit]
            .iter()
            .take_while(|&&b| b == byte)
            .count();
        if len >= MIN_MATCH { len } else { 0 }
    }

    /// Seed the window with a preset dictionary.
    ///
    /// At most `max_dist()` trailing bytes are kept. Returns the number of
    /// bytes loaded, which is 0 for dictionaries shorter than
    /// [`MIN_MATCH`].
    pub fn load_dictionary(&mut self, dictionary: &[u8]) -> usize {
        if dictionary.len() < MIN_MATCH {
            return 0;
        }
        let tail = &dictionary[dictionary.len().saturating_sub(self.max_dist())..];
        let length = tail.len();
        self.window[..length].copy_from_slice(tail);
        self.strstart = length;
        self.block_start = length as isize;

        self.ins_h = self.update_hash(self.window[0] as usize, self.window[1]);
        for n in 0..=length - MIN_MATCH {
            self.insert_string(n);
        }
        length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::level_config;

    fn primed(data: &[u8]) -> MatchFinder {
        let mut finder = MatchFinder::new(15, 8);
        let mut src = Source::new(data);
        finder.fill_window(&mut src);
        finder
    }

    #[test]
    fn test_source_read() {
        let mut src = Source::new(b"abcdef");
        let mut buf = [0u8; 4];
        assert_eq!(src.read(&mut buf), 4);
        assert_eq!(src.consumed(), 4);
        assert_eq!(src.consumed_since(1), b"bcd");
        assert_eq!(src.read(&mut buf), 2);
        assert!(src.is_empty());
    }

    #[test]
    fn test_fill_window_reads_input() {
        let data = vec![7u8; 1000];
        let finder = primed(&data);
        assert_eq!(finder.lookahead, 1000);
        assert_eq!(finder.strstart, 0);
    }

    #[test]
    fn test_insert_and_find_match() {
        let data = b"abcdefgh_abcdefgh_abcdefgh";
        let mut finder = primed(data);
        let config = level_config(9);

        // Hash every position up to the second copy.
        for pos in 0..9 {
            finder.insert_string(pos);
        }
        finder.strstart = 9;
        finder.lookahead = data.len() - 9;
        let head = finder.insert_string(9);
        assert_eq!(head, 0, "position 0 is the empty link");

        finder.strstart = 18;
        finder.lookahead = data.len() - 18;
        for pos in 10..18 {
            finder.insert_string(pos);
        }
        let head = finder.insert_string(18);
        assert_eq!(head, 9);
        let len = finder.longest_match(head, config);
        assert_eq!(len, 8);
        assert_eq!(finder.match_start, 9);
    }

    #[test]
    fn test_match_capped_by_lookahead() {
        let mut data = vec![b'x'; 40];
        data[0] = b'y';
        let mut finder = primed(&data);
        finder.reseed_hash();
        for pos in 0..5 {
            finder.insert_string(pos);
        }
        finder.strstart = 5;
        finder.lookahead = 10;
        let head = finder.insert_string(5);
        assert_eq!(head, 4);
        let len = finder.longest_match(head, level_config(9));
        assert_eq!(len, 10);
    }

    #[test]
    fn test_run_length() {
        let mut data = vec![b'a'];
        data.extend(std::iter::repeat_n(b'b', 300));
        let mut finder = primed(&data);
        assert_eq!(finder.run_length(), 0);

        finder.strstart = 2;
        finder.lookahead = data.len() - 2;
        assert_eq!(finder.run_length(), MAX_MATCH);

        finder.match_floor = 2;
        assert_eq!(finder.run_length(), 0);
    }

    #[test]
    fn test_slide_rebases_positions() {
        let mut finder = MatchFinder::new(9, 1);
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut src = Source::new(&data);
        finder.fill_window(&mut src);
        assert_eq!(finder.lookahead, 1024);

        finder.strstart = 1024 - 10;
        finder.lookahead = 10;
        finder.block_start = 600;
        finder.fill_window(&mut src);
        assert_eq!(finder.strstart, 1024 - 10 - 512);
        assert_eq!(finder.block_start, 600 - 512);
        assert_eq!(finder.window[finder.strstart], data[1024 - 10]);
    }

    #[test]
    fn test_load_dictionary() {
        let mut finder = MatchFinder::new(9, 8);
        assert_eq!(finder.load_dictionary(b"ab"), 0);

        let dict: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
        let loaded = finder.load_dictionary(&dict);
        assert_eq!(loaded, finder.max_dist());
        assert_eq!(finder.strstart, loaded);
        assert_eq!(finder.block_start, loaded as isize);
        assert_eq!(finder.window[loaded - 1], dict[999]);
    }
}
