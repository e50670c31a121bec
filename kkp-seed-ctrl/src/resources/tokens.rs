use rand::Rng;
use rand::distributions::Alphanumeric;

const TOKEN_ID_LENGTH: usize = 6;
const TOKEN_SECRET_LENGTH: usize = 16;

// Lowercase alphanumerics only, the same alphabet kubeadm bootstrap tokens use
pub fn random_lowercase_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|c| (c as char).to_ascii_lowercase())
        .take(len)
        .collect()
}

// Tokens have the form [a-z0-9]{6}.[a-z0-9]{16}
pub fn generate_token() -> String {
    format!("{}.{}", random_lowercase_string(TOKEN_ID_LENGTH), random_lowercase_string(TOKEN_SECRET_LENGTH))
}

pub fn tokens_csv(admin_token: &str) -> String {
    format!("{admin_token},admin,admin,system:masters\n")
}
