// (c) Roel Kluin, 2023, GPL v3

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Bounded stack of recent debug notes, with a count per file:line:format.
pub struct StatDeq {
    last: (String, String),
    repeat: u32,
    cap: usize,
    d: VecDeque<String>,
    h: HashMap<String, u32>,
}

impl StatDeq {
    fn new(cap: usize) -> Self {
        StatDeq {
            last: (String::new(), String::new()),
            repeat: 0,
            cap,
            d: VecDeque::with_capacity(cap),
            h: HashMap::new(),
        }
    }
    pub(crate) fn add(&mut self, fmt: String, msg: String) {
        if self.last.0 == fmt && self.last.1 == msg {
            self.repeat += 1;
            return;
        }
        if !self.last.0.is_empty() {
            let mut last_msg = std::mem::take(&mut self.last.1);
            if self.repeat > 0 {
                last_msg.push_str(&format!(" (repeated {} times)", self.repeat));
            }
            if self.d.len() == self.cap {
                self.d.pop_front();
            }
            self.d.push_back(last_msg);
            *self.h.entry(std::mem::take(&mut self.last.0)).or_insert(0) += 1;
        }
        self.repeat = 0;
        self.last = (fmt, msg);
    }
    pub(crate) fn dump(&mut self) -> String {
        self.add(String::new(), String::new());
        let mut out = String::from("Note stack:\n");
        for msg in self.d.iter() {
            out.push_str(msg);
            out.push('\n');
        }
        out.push_str("--\nTotal file:line:msg(format) and counts:\n");
        for (msg, ct) in &self.h {
            out.push_str(&format!("{}\t{}\n", msg, ct));
        }
        out
    }
    pub(crate) fn len(&self) -> usize {
        self.d.len()
    }
}

lazy_static! {
    pub static ref STAT_DB: Mutex<StatDeq> = Mutex::new(StatDeq::new(128));
}

#[doc(hidden)]
pub fn note(fmt: String, msg: String) {
    if let Ok(mut db) = STAT_DB.lock() {
        db.add(fmt, msg);
    }
}

#[doc(hidden)]
pub fn dump() -> String {
    STAT_DB
        .lock()
        .map(|mut db| db.dump())
        .unwrap_or_else(|_| String::from("note stack poisoned"))
}

#[macro_export]
macro_rules! dbg_print {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        if cfg!(debug_assertions) {
            $crate::rdbg::note(
                format!("{}:{}:{}", file!(), line!(), $fmt),
                format!($fmt $(, $arg)*),
            );
        }
    }};
}

#[macro_export]
macro_rules! dbg_assert {
    ($test:expr $(,)?) => {{
        if cfg!(debug_assertions) && !$test {
            panic!("{}assertion failed: {}", $crate::rdbg::dump(), stringify!($test));
        }
    }};
    ($test:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        if cfg!(debug_assertions) && !$test {
            panic!("{}{}", $crate::rdbg::dump(), format!($fmt $(, $arg)*));
        }
    }};
}

#[macro_export]
macro_rules! dbg_assert_eq {
    ($left:expr, $right:expr $(,)?) => {{
        if cfg!(debug_assertions) {
            match (&$left, &$right) {
                (l, r) => {
                    if *l != *r {
                        panic!("{}assertion failed: {:?} != {:?}", $crate::rdbg::dump(), l, r);
                    }
                }
            }
        }
    }};
}
