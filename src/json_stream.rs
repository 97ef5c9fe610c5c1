//! Incremental extraction of array elements from streamed model output.
//!
//! The model streams something like `{"items":[{...},{...}` one token at a time.
//! `ArrayScanner` watches the first JSON array in that text and hands back the
//! source of each element as soon as its closing brace arrives. Elements come
//! out in order and exactly once, so a caller collecting them only ever sees a
//! growing, order-stable prefix of the final array.

#[derive(Debug, Default)]
pub struct ArrayScanner {
  buf: String,
  /// Next byte of `buf` to examine.
  pos: usize,
  in_string: bool,
  escaped: bool,
  /// Nesting depth counted from the outermost value in the stream.
  depth: usize,
  /// Depth directly inside the item array, once found.
  elem_depth: Option<usize>,
  /// Start of the element currently being read.
  elem_start: Option<usize>,
  closed: bool,
}

impl ArrayScanner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Feed the next chunk of text, returning every element completed by it.
  pub fn feed(&mut self, chunk: &str) -> Vec<String> {
    let mut out = Vec::new();
    if self.closed {
      return out;
    }
    self.buf.push_str(chunk);

    while self.pos < self.buf.len() {
      let b = self.buf.as_bytes()[self.pos];
      let at = self.pos;
      self.pos += 1;

      if self.in_string {
        if self.escaped {
          self.escaped = false;
        } else if b == b'\\' {
          self.escaped = true;
        } else if b == b'"' {
          self.in_string = false;
        }
        continue;
      }

      match b {
        b'"' => {
          self.in_string = true;
          self.mark_scalar_start(at);
        }
        b'{' | b'[' => {
          if b == b'[' && self.elem_depth.is_none() {
            self.depth += 1;
            self.elem_depth = Some(self.depth);
            continue;
          }
          if Some(self.depth) == self.elem_depth && self.elem_start.is_none() {
            self.elem_start = Some(at);
          }
          self.depth += 1;
        }
        b'}' | b']' => {
          if Some(self.depth) == self.elem_depth {
            if b == b']' {
              // Closing the item array itself; a pending scalar element ends here.
              if let Some(start) = self.elem_start.take() {
                out.push(self.buf[start..at].trim().to_string());
              }
              self.closed = true;
              break;
            }
            // Stray close at element level: malformed, leave it to the parser.
            continue;
          }
          self.depth = self.depth.saturating_sub(1);
          if Some(self.depth) == self.elem_depth {
            if let Some(start) = self.elem_start.take() {
              out.push(self.buf[start..=at].to_string());
            }
          }
        }
        b',' => {
          if Some(self.depth) == self.elem_depth {
            if let Some(start) = self.elem_start.take() {
              out.push(self.buf[start..at].trim().to_string());
            }
          }
        }
        b if b.is_ascii_whitespace() => {}
        _ => self.mark_scalar_start(at),
      }
    }

    self.compact();
    out
  }

  /// True once the item array's closing bracket has been seen.
  pub fn is_closed(&self) -> bool {
    self.closed
  }

  fn mark_scalar_start(&mut self, at: usize) {
    if Some(self.depth) == self.elem_depth && self.elem_start.is_none() {
      self.elem_start = Some(at);
    }
  }

  // Drop text nobody can refer to any more.
  fn compact(&mut self) {
    let keep_from = self.elem_start.unwrap_or(self.pos);
    if keep_from > 0 {
      self.buf.drain(..keep_from);
      self.pos -= keep_from;
      if let Some(s) = self.elem_start.as_mut() {
        *s -= keep_from;
      }
    }
  }
}
