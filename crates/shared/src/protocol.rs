use std::{net::SocketAddr, time::Duration};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::Appointment;

pub const DEFAULT_SERVER_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 3000);
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);
/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM_BYTES: usize = 65_507;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Error,
}

/// The `dados` field of a reply: absent, one record, or a list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    #[default]
    Empty,
    One(Appointment),
    Many(Vec<Appointment>),
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Payload::Empty => serializer.serialize_none(),
            Payload::One(appointment) => appointment.serialize(serializer),
            Payload::Many(appointments) => appointments.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Many(Vec<Appointment>),
            One(Appointment),
        }

        Ok(match Option::<Shape>::deserialize(deserializer)? {
            None => Payload::Empty,
            Some(Shape::One(appointment)) => Payload::One(appointment),
            Some(Shape::Many(appointments)) => Payload::Many(appointments),
        })
    }
}

/// One reply datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(rename = "dados", default)]
    pub data: Payload,
    #[serde(rename = "mensagem")]
    pub message: String,
}

impl Response {
    pub fn success(data: Payload, message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            data,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: Payload::Empty,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Request datagrams carry the command line itself, trimmed.
pub fn encode_request(line: &str) -> Vec<u8> {
    line.trim().as_bytes().to_vec()
}

/// Lossy so that a datagram with stray invalid bytes still reaches the
/// grammar and gets a format error back.
pub fn decode_request(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::AppointmentId;

    fn meeting(id: u64) -> Appointment {
        Appointment {
            id: AppointmentId(id),
            date: "2025-09-26".into(),
            time: "10:00".into(),
            duration: 60,
            title: "Meeting".into(),
            description: String::new(),
        }
    }

    #[test]
    fn wire_keys_match_existing_clients() {
        let response = Response::success(Payload::One(meeting(1)), "Appointment added successfully.");
        let value: serde_json::Value =
            serde_json::from_slice(&response.encode().expect("encode")).expect("json");
        assert_eq!(
            value,
            json!({
                "status": "SUCCESS",
                "dados": {
                    "id": 1,
                    "date": "2025-09-26",
                    "time": "10:00",
                    "duration": 60,
                    "title": "Meeting",
                    "description": ""
                },
                "mensagem": "Appointment added successfully."
            })
        );
    }

    #[test]
    fn payload_shape_survives_decode() {
        let cases = [
            Response::error("Appointment with ID 999 not found."),
            Response::success(Payload::One(meeting(3)), "one"),
            Response::success(Payload::Many(vec![meeting(1), meeting(2)]), "2 appointment(s) found."),
            Response::success(Payload::Many(Vec::new()), "none"),
        ];
        for response in cases {
            let decoded = Response::decode(&response.encode().expect("encode")).expect("decode");
            assert_eq!(decoded, response);
        }
    }

    #[test]
    fn error_reply_encodes_null_data() {
        let bytes = Response::error("Unknown command: FOO").encode().expect("encode");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(value["status"], "ERROR");
        assert!(value["dados"].is_null());
    }

    #[test]
    fn decode_tolerates_missing_data_and_description() {
        let raw = br#"{"status":"SUCCESS","dados":{"id":4,"date":"d","time":"t","duration":5,"title":"x"},"mensagem":"ok"}"#;
        let response = Response::decode(raw).expect("decode");
        let Payload::One(appointment) = response.data else {
            panic!("expected a single record");
        };
        assert_eq!(appointment.description, "");

        let response = Response::decode(br#"{"status":"ERROR","mensagem":"nope"}"#).expect("decode");
        assert_eq!(response.data, Payload::Empty);
    }

    #[test]
    fn request_lines_are_trimmed_both_ways() {
        assert_eq!(encode_request("  LIST ALL \n"), b"LIST ALL".to_vec());
        assert_eq!(decode_request(b"\tDELETE 3\r\n"), "DELETE 3");
        assert_eq!(decode_request(b"   "), "");
    }
}
