use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationInfo {
    pub name: String,
    pub email: String,
    pub mac: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl RegistrationInfo {
    pub fn new(name: &str, email: &str, mac: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            mac: mac.to_string(),
            visible: true,
        }
    }

    pub fn to_json(&self) -> String {
        // Serialization of plain strings and a bool cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn json_shape_is_stable() {
        let info = RegistrationInfo::new("Ada Lovelace", "ada@example.org", "24A160FFEE01");

        assert_eq!(
            info.to_json(),
            "{\"name\":\"Ada Lovelace\",\"email\":\"ada@example.org\",\"mac\":\"24A160FFEE01\",\"visible\":true}"
        );
    }

    #[test]
    fn visibility_defaults_on_when_absent() {
        let info: RegistrationInfo =
            serde_json::from_str("{\"name\":\"a\",\"email\":\"b\",\"mac\":\"c\"}").unwrap();

        assert!(info.visible);
    }
}
