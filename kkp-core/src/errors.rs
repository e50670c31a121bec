pub use std::backtrace::Backtrace;

pub use anyhow::{
    anyhow,
    bail,
    ensure,
};
use lazy_static::lazy_static;
pub use paste::paste;
use regex::{
    Regex,
    RegexBuilder,
};
pub use thiserror::Error;

pub type EmptyResult = anyhow::Result<()>;

const BUILD_DIR: &str = "/.build/";
const RUSTC_DIR: &str = "/rustc/";
const CARGO_REGISTRY_DIR: &str = "/.cargo/registry/";
const GLIBC: &str = "glibc";

lazy_static! {
    static ref FRAME_RE: Regex = RegexBuilder::new(r"^\s+\d+(?s:.*?)(\s+at\s+.*:\d+)$")
        .multi_line(true)
        .build()
        .expect("static backtrace regex");
}

// This macro creates an enum which derives from thiserror::Error, and also
// creates constructor functions in snake case for each of the enum variants
#[macro_export]
macro_rules! err_impl {
    (@hidden $errtype:ident, $item:ident, String) => {
        paste! {
            pub fn [<$item:snake>](in_: &str) -> anyhow::Error {
                anyhow!{$errtype::$item(in_.into())}
            }
        }
    };

    (@hidden $errtype:ident, $item:ident, $($dtype:tt)::+) => {
        paste! {
            pub fn [<$item:snake>](in_: &$($dtype)::+) -> anyhow::Error {
                anyhow!{$errtype::$item(in_.clone())}
            }
        }
    };

    ($errtype:ident,
        $(#[$errinfo:meta] $item:ident($($dtype:tt)::+),)+
    ) => {
        #[derive(Debug, Error)]
        pub enum $errtype {
            $(#[$errinfo] $item($($dtype)::+)),+
        }

        impl $errtype {
            $(err_impl! {@hidden $errtype, $item, $($dtype)::+})+
        }
    };
}

// Tokio and the kube runtime put 70-odd frames on every backtrace; this keeps only the frames that
// point into our own sources and collapses runs of the others into a "skipped" marker.
pub fn prune_backtrace(bt: &str) -> String {
    let mut skipped_frames = 0;
    let mut pruned = FRAME_RE.find_iter(bt).fold(String::new(), |mut acc, frame| {
        let frame = frame.as_str();
        if is_foreign_frame(frame) {
            skipped_frames += 1;
        } else if !frame.is_empty() {
            acc += &skipped_marker(skipped_frames);
            acc += &format!("{frame}\n");
            skipped_frames = 0;
        }
        acc
    });

    pruned += skipped_marker(skipped_frames).trim_end();
    pruned
}

fn is_foreign_frame(frame: &str) -> bool {
    [BUILD_DIR, RUSTC_DIR, CARGO_REGISTRY_DIR, GLIBC]
        .iter()
        .any(|dir| frame.contains(dir))
}

fn skipped_marker(count: usize) -> String {
    match count {
        0 => String::new(),
        1 => "      -- <skipped 1 frame> --\n".into(),
        n => format!("      -- <skipped {n} frames> --\n"),
    }
}

// Log an anyhow error along with the interesting part of its backtrace.  This is reasonably
// expensive, so it should only be called on the error path.
#[macro_export]
macro_rules! logerr {
    (@hidden $err:ident, $msg:literal, $($args:expr),*) => {
        let bt = $crate::errors::prune_backtrace(&$err.backtrace().to_string());
        error!(concat!($msg, "\n\n{}\n\nPartial Stack Trace:\n\n{}\n\n") $(, $args)*, $err, bt);
    };

    ($err:ident, $msg:literal) => {
        logerr! {@hidden $err, $msg, };
    };

    ($err:ident, $msg:literal, $($args:expr),*) => {
        logerr! {@hidden $err, $msg, $($args),*};
    };
}

pub use {
    err_impl,
    logerr,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_backtrace() {
        let bt = "   0: kkp_seed_ctrl::controller::reconcile
             at ./kkp-seed-ctrl/src/controller.rs:42:5
   1: tokio::runtime::task::core::Core
             at /root/.cargo/registry/src/tokio-1.45.1/src/runtime/task/core.rs:331:17
   2: std::panicking::try
             at /rustc/abc123/library/std/src/panicking.rs:557:40
   3: kkp_core::reconciling::ensure_named_object
             at ./kkp-core/src/reconciling/mod.rs:90:9
   4: std::rt::lang_start
             at /rustc/abc123/library/std/src/rt.rs:159:18";

        let pruned = prune_backtrace(bt);
        assert!(pruned.contains("controller.rs:42:5"));
        assert!(pruned.contains("-- <skipped 2 frames> --"));
        assert!(pruned.contains("reconciling/mod.rs:90:9"));
        assert!(pruned.ends_with("-- <skipped 1 frame> --"));
        assert!(!pruned.contains("tokio"));
    }
}
