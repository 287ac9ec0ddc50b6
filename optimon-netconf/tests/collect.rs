//! End-to-end tests: parsed device response to output lines.

use optimon_common::{write_collection, write_discovery};
use optimon_netconf::config::NetconfCollectorConfig;
use optimon_netconf::pipeline::{collect_metrics, discover_instances};

const CONFIG: &str = r#"
{
    device: {
        host: "ws1.example.net",
        username: "monitor",
        password: "secret",
    },
    filter: "<waveserver-ports xmlns='urn:ciena:params:xml:ns:yang:ciena-ws-port'/>",
    namespaces: {
        "ws-port": "urn:ciena:params:xml:ns:yang:ciena-ws-port",
    },
    interfaces: [
        {
            name: "port",
            path: "ws-port:waveserver-ports/ws-port:ports",
            instance_key: "alias-name",
            fallback_id_key: "port-name",
            description_key: "label",
            metrics: [
                { name: "rx_power", path: "rx-power" },
                {
                    name: "oper_state",
                    path: "state/operational-state",
                    string_map: { "up": 1, "down": 0 },
                },
            ],
        },
    ],
    chassis: {
        metrics: [
            { name: "ne_temperature", path: "ne/temperature" },
        ],
    },
}
"#;

const RESPONSE: &str = r#"
<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="1">
  <data>
    <waveserver-ports xmlns="urn:ciena:params:xml:ns:yang:ciena-ws-port">
      <ports>
        <alias-name>span to POP3</alias-name>
        <port-name>1-1</port-name>
        <label>OTS-1-1-1</label>
        <rx-power>-12.5</rx-power>
        <state><operational-state>up</operational-state></state>
      </ports>
      <ports>
        <port-name>1-2</port-name>
        <label>OTS-1-1-2</label>
        <rx-power>-40.0</rx-power>
        <state><operational-state>down</operational-state></state>
      </ports>
    </waveserver-ports>
    <ne xmlns="http://example.com/yang/ne">
      <temperature>42</temperature>
    </ne>
  </data>
</rpc-reply>
"#;

#[test]
fn discovery_emits_one_line_per_instance() {
    let config = NetconfCollectorConfig::parse(CONFIG).unwrap();
    config.validate().unwrap();

    let doc = roxmltree::Document::parse(RESPONSE).unwrap();
    let instances = discover_instances(&doc, &config);

    let mut buf = Vec::new();
    write_discovery(&mut buf, &instances).unwrap();
    let output = String::from_utf8(buf).unwrap();

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "span_to_POP3##span to POP3##OTS-1-1-1####auto.interface_type=port"
    );
    assert_eq!(lines[1], "1-2##1-2##OTS-1-1-2####auto.interface_type=port");
}

#[test]
fn collection_emits_batch_and_device_level_lines() {
    let config = NetconfCollectorConfig::parse(CONFIG).unwrap();

    let doc = roxmltree::Document::parse(RESPONSE).unwrap();
    let samples = collect_metrics(&doc, &config);

    let mut buf = Vec::new();
    write_collection(&mut buf, &samples).unwrap();
    let output = String::from_utf8(buf).unwrap();

    let lines: Vec<&str> = output.lines().collect();
    assert!(lines.contains(&"span_to_POP3.rx_power=-12.5"));
    assert!(lines.contains(&"span_to_POP3.oper_state=1"));
    assert!(lines.contains(&"1-2.rx_power=-40"));
    assert!(lines.contains(&"1-2.oper_state=0"));
    // Chassis sample has no instance prefix.
    assert!(lines.contains(&"ne_temperature=42"));
}

#[test]
fn discovery_ids_match_collection_ids() {
    let config = NetconfCollectorConfig::parse(CONFIG).unwrap();
    let doc = roxmltree::Document::parse(RESPONSE).unwrap();

    let discovered: Vec<String> = discover_instances(&doc, &config)
        .into_iter()
        .map(|i| i.id)
        .collect();

    for sample in collect_metrics(&doc, &config) {
        if let Some(id) = &sample.instance_id {
            assert!(discovered.contains(id), "unknown instance id {id}");
        }
    }
}

#[test]
fn namespace_free_response_still_discovers() {
    let config = NetconfCollectorConfig::parse(CONFIG).unwrap();

    let plain = r#"
    <rpc-reply>
      <data>
        <waveserver-ports>
          <ports><alias-name>p1</alias-name></ports>
        </waveserver-ports>
      </data>
    </rpc-reply>
    "#;
    let doc = roxmltree::Document::parse(plain).unwrap();

    let instances = discover_instances(&doc, &config);
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].id, "p1");
}

#[test]
fn empty_response_yields_no_lines() {
    let config = NetconfCollectorConfig::parse(CONFIG).unwrap();
    let doc = roxmltree::Document::parse("<rpc-reply><data/></rpc-reply>").unwrap();

    assert!(discover_instances(&doc, &config).is_empty());
    assert!(collect_metrics(&doc, &config).is_empty());
}
