use serde::Serialize;

/// Replacement policy for values that must not reach the logs whole.
pub trait MaskPolicy {
    fn mask(value: &str) -> String;
}

/// Keeps the last four characters, like a card receipt.
#[derive(Debug)]
pub struct LastFour;

impl MaskPolicy for LastFour {
    fn mask(value: &str) -> String {
        let len = value.len();
        if len > 4 {
            "*".repeat(len - 4) + &value[len - 4..]
        } else {
            value.to_string()
        }
    }
}

/// Return true if a key holds a value that must never be logged at all:
/// the hpp_key shared secret or a card verification code.
fn is_secret_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k == "hpp_key" || k.contains("secret") || k.contains("cvd") || k.contains("cvv")
}

/// Return true if a key likely holds a card number or a transaction key,
/// values whose tail is still useful when reading logs.
fn is_tail_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k.contains("transactionkey")
        || k == "pan"
        || k.contains("card") && (k.contains("number") || k.contains("num"))
}

pub fn secure_serializable(v: impl Serialize) -> serde_json::Value {
    let value = serde_json::to_value(v).expect("serialization is infallible");
    secure_value(&value)
}

pub fn secure_value(v: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match v {
        Value::Object(map) => {
            let mut new = serde_json::Map::with_capacity(map.len());
            for (k, val) in map {
                let secret = is_secret_key(k);
                let tail = is_tail_key(k);
                let new_val = match val {
                    Value::String(_) if secret => Value::String("***".to_string()),
                    Value::String(s) if tail => Value::String(LastFour::mask(s)),
                    Value::Number(_) if secret => Value::String("***".to_string()),
                    Value::Number(n) if tail => {
                        let s = n.to_string();
                        Value::String(LastFour::mask(&s))
                    }
                    _ => secure_value(val),
                };
                new.insert(k.clone(), new_val);
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(secure_value).collect()),
        // primitives that are not objects: leave them as-is
        other => other.clone(),
    }
}
