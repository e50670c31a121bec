pub use std::collections::BTreeMap;

// Generate labels for a k8s object, using klabel!("app" => "etcd", "cluster" => name) syntax;
// keys and values can be any expression that implements ToString
#[macro_export]
macro_rules! klabel {
    ($($key:expr => $val:expr),+$(,)?) => {
        Some(BTreeMap::from([$(($key.to_string(), $val.to_string())),+]))
    };
}

// Same as klabel! but without the Option, for selectors and pod templates
#[macro_export]
macro_rules! kmap {
    ($($key:expr => $val:expr),+$(,)?) => {
        BTreeMap::from([$(($key.to_string(), $val.to_string())),+])
    };
}

pub use {
    klabel,
    kmap,
};
