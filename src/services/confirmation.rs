use rand::Rng;

const PREFIX: &str = "CB";

/// Issues a `CB` + six digit confirmation number. Uniqueness is enforced by the store.
pub fn generate_confirmation_number() -> String {
    let digits: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("{}{}", PREFIX, digits)
}
