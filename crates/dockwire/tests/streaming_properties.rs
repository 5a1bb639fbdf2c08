//! Chunk-boundary independence and request building through the public API.

use dockwire::{
    Call, CallResult, ConnectionDescriptor, Dispatcher, ErrorKind, Framing, Resource,
    TransportKind,
};
use rstest::rstest;
use serde_json::Value;

fn dispatch(framing: Framing, chunks: &[&[u8]]) -> Vec<Value> {
    let mut dispatcher = Dispatcher::new(framing);
    let mut documents = Vec::new();
    for chunk in chunks {
        documents.extend(dispatcher.push(chunk).expect("push"));
    }
    documents.extend(dispatcher.finish());
    documents
}

fn strings(documents: &[Value], field: &str) -> Vec<String> {
    documents
        .iter()
        .filter_map(|document| document.get(field).and_then(Value::as_str))
        .map(str::to_owned)
        .collect()
}

#[test]
fn concatenated_documents_survive_every_three_way_split() {
    let input = br#"{"id":"a"}{"id":"b"}{"id":"c"}"#.as_slice();
    for first in 0..=input.len() {
        for second in first..=input.len() {
            let (head, rest) = input.split_at(first);
            let (middle, tail) = rest.split_at(second - first);
            let documents = dispatch(Framing::Concatenated, &[head, middle, tail]);
            assert_eq!(
                strings(&documents, "id"),
                ["a", "b", "c"],
                "splits at {first} and {second}"
            );
        }
    }
}

#[test]
fn newline_framing_matches_single_chunk_delivery() {
    let input = b"{\"Type\":\"x\"}\n{\"Type\":\"y\"}\n".as_slice();
    let whole = dispatch(Framing::Lines, &[input]);
    assert_eq!(strings(&whole, "Type"), ["x", "y"]);
    for split in 0..=input.len() {
        let (head, tail) = input.split_at(split);
        assert_eq!(dispatch(Framing::Lines, &[head, tail]), whole);
    }
}

#[test]
fn one_byte_chunks_keep_escaped_braces_together() {
    let input = br#"{"msg":"a \"{}\" b"}"#;
    let chunks: Vec<&[u8]> = input.chunks(1).collect();
    let documents = dispatch(Framing::Concatenated, &chunks);
    assert_eq!(strings(&documents, "msg"), [r#"a "{}" b"#]);
}

#[test]
fn logs_url_omits_absent_parameters() {
    let mut call = Call::new(Resource::Containers, "logs").with_id("abc123");
    call.params_mut()
        .push_enabled("stdout", true)
        .push_number("tail", 10)
        .push_optional("since", None::<i64>);
    let descriptor = ConnectionDescriptor::unix("/var/run/docker.sock", "1.39").expect("unix");

    let url = descriptor.url_for(&call.target(descriptor.api_version()));

    assert!(url.contains("/containers/abc123/logs"), "{url}");
    assert!(url.contains("stdout=true"), "{url}");
    assert!(url.contains("tail=10"), "{url}");
    assert!(!url.contains("since"), "{url}");
}

#[rstest]
#[case("http://localhost:2375", TransportKind::Tcp)]
#[case("https://localhost:2376", TransportKind::Tls)]
#[case("/var/run/docker.sock", TransportKind::UnixSocket)]
#[case("./docker.sock", TransportKind::UnixSocket)]
fn transport_is_chosen_by_syntax(#[case] target: &str, #[case] expected: TransportKind) {
    let descriptor = ConnectionDescriptor::from_target(target, "1.39").expect("descriptor");
    assert_eq!(descriptor.transport(), expected);
}

#[test]
fn unreached_calls_are_distinguishable_from_refused_ones() {
    let unreached = CallResult::rejected("container id is required");
    assert!(!unreached.is_ok());
    assert_eq!(unreached.kind(), ErrorKind::InvalidInput);
    assert_eq!(unreached.status(), None);
}
