//! String similarity primitives for template scoring.
//!
//! All lengths are counted in Unicode scalar values so that templates with
//! non-ASCII text score the same way regardless of byte width.

use std::collections::HashMap;

/// Sequences at least this long get the auto-junk treatment.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Levenshtein distance (insert, delete, substitute all cost 1).
pub fn levenshtein(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  let n = b.len();

  let mut prev: Vec<usize> = (0..=n).collect();
  let mut curr = vec![0; n + 1];

  for i in 1..=a.len() {
    curr[0] = i;
    for j in 1..=n {
      let cost = usize::from(a[i - 1] != b[j - 1]);
      curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
    }
    std::mem::swap(&mut prev, &mut curr);
  }

  prev[n]
}

/// A run of equal elements: `a[a_start..a_start + size] == b[b_start..b_start + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchBlock {
  pub a_start: usize,
  pub b_start: usize,
  pub size: usize,
}

/// Ratcliff/Obershelp matcher over two char sequences.
///
/// Reproduces `difflib.SequenceMatcher` without a junk predicate: when `b` has
/// at least 200 elements, any element occurring more than `len / 100 + 1`
/// times is left out of the index ("popular"). Popular elements can still
/// extend a match, they just never seed one.
struct SequenceMatcher {
  a: Vec<char>,
  b: Vec<char>,
  b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
  fn new(a: &str, b: &str) -> Self {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
      b2j.entry(c).or_default().push(j);
    }

    if b.len() >= AUTOJUNK_MIN_LEN {
      let threshold = b.len() / 100 + 1;
      b2j.retain(|_, positions| positions.len() <= threshold);
    }

    Self { a, b, b2j }
  }

  /// Longest matching block in `a[alo..ahi]` and `b[blo..bhi]`, earliest in `a` on ties.
  fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> MatchBlock {
    let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
      let mut next: HashMap<usize, usize> = HashMap::new();
      if let Some(positions) = self.b2j.get(&self.a[i]) {
        for &j in positions {
          if j < blo {
            continue;
          }
          if j >= bhi {
            break;
          }
          let k = j.checked_sub(1).and_then(|p| j2len.get(&p)).copied().unwrap_or(0) + 1;
          next.insert(j, k);
          if k > bestsize {
            besti = i + 1 - k;
            bestj = j + 1 - k;
            bestsize = k;
          }
        }
      }
      j2len = next;
    }

    while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
      besti -= 1;
      bestj -= 1;
      bestsize += 1;
    }
    while besti + bestsize < ahi && bestj + bestsize < bhi && self.a[besti + bestsize] == self.b[bestj + bestsize] {
      bestsize += 1;
    }

    MatchBlock {
      a_start: besti,
      b_start: bestj,
      size: bestsize,
    }
  }

  fn matching_blocks(&self) -> Vec<MatchBlock> {
    let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
    let mut blocks = Vec::new();

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
      let block = self.find_longest_match(alo, ahi, blo, bhi);
      if block.size == 0 {
        continue;
      }
      let (i, j, k) = (block.a_start, block.b_start, block.size);
      blocks.push(block);
      if alo < i && blo < j {
        queue.push((alo, i, blo, j));
      }
      if i + k < ahi && j + k < bhi {
        queue.push((i + k, ahi, j + k, bhi));
      }
    }

    blocks.sort_by_key(|b| (b.a_start, b.b_start));
    blocks
  }
}

/// Non-overlapping matching blocks of `a` against `b`, ordered by position.
pub fn matching_blocks(a: &str, b: &str) -> Vec<MatchBlock> {
  SequenceMatcher::new(a, b).matching_blocks()
}

/// Total size of the matching blocks, the "LCS length" reported per template.
pub fn lcs_length(a: &str, b: &str) -> usize {
  matching_blocks(a, b).iter().map(|b| b.size).sum()
}

/// `1 - distance / max_len`, or 0 when both strings are empty.
pub fn edit_similarity(distance: usize, parsed: &str, ground_truth: &str) -> f64 {
  let max_len = parsed.chars().count().max(ground_truth.chars().count());
  if max_len == 0 {
    return 0.0;
  }
  1.0 - distance as f64 / max_len as f64
}

/// `lcs / len(ground_truth)`, or 0 when the ground truth is empty.
pub fn lcs_similarity(lcs: usize, ground_truth: &str) -> f64 {
  let gt_len = ground_truth.chars().count();
  if gt_len == 0 {
    return 0.0;
  }
  lcs as f64 / gt_len as f64
}
