#[cfg(test)]
mod test {
    use crate::{
        entity::Entity,
        error::ClientError as Error,
        registry::policy,
        repository::Repository,
        stix2::{
            convert_markdown, from_stix2, pick_aliases, profile_for_stix_type, profile_of, to_stix2, ExportMode,
            ExportOptions, ImportExtras, MarkingCeiling, OPENCTI_EXTENSION_ID,
        },
        testing::ScriptedTransport,
        types::EntityKind,
    };
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map, Value};
    use test_log::test;

    /// What the knowledge base would return when reading an object created from an input
    fn stored(entity_type: &str, input: &Value) -> Entity {
        let mut object = input.as_object().cloned().unwrap_or_default();
        let standard_id = object.remove("stix_id").unwrap_or(Value::Null);
        object.insert("id".to_string(), json!("internal-1"));
        object.insert("standard_id".to_string(), standard_id);
        object.insert("entity_type".to_string(), json!(entity_type));
        Entity::from_graphql(Value::Object(object)).unwrap()
    }

    fn red_marking() -> Value {
        json!({
            "id": "marking-red",
            "standard_id": "marking-definition--5e57c739-391a-4eb3-b6be-7d15ca92d5ed",
            "entity_type": "Marking-Definition",
            "definition_type": "TLP",
            "definition": "TLP:RED",
            "x_opencti_order": 4,
            "x_opencti_color": "#c62828",
            "created": "2020-02-25T09:02:29.040Z"
        })
    }

    fn malware() -> Entity {
        Entity::from_graphql(json!({
            "id": "malware-1",
            "standard_id": "malware--fa1d6f28-2fbc-4e1c-b2fb-1c6b2bd8a5b0",
            "entity_type": "Malware",
            "name": "Emotet",
            "description": "",
            "aliases": ["Geodo"],
            "is_family": true,
            "first_seen": "2014-06-01T00:00:00Z",
            "created": "2020-01-01T10:00:00Z",
            "modified": "2020-01-02T10:00:00.5Z",
            "createdBy": {
                "id": "identity-1",
                "standard_id": "identity--7b82b010-b1c0-4dae-981f-7756374a17df",
                "entity_type": "Organization",
                "name": "ACME",
                "x_opencti_reliability": "B"
            },
            "objectMarking": {"edges": [{"node": red_marking()}]},
            "objectLabel": {"edges": []},
            "externalReferences": {"edges": [{"node": {
                "id": "reference-1",
                "source_name": "mitre-attack",
                "external_id": "S0367",
                "url": "https://attack.mitre.org/software/S0367",
                "description": null
            }}]},
            "killChainPhases": {"edges": [{"node": {
                "id": "phase-1",
                "kill_chain_name": "mitre-attack",
                "phase_name": "initial-access",
                "x_opencti_order": 1
            }}]}
        }))
        .unwrap()
    }

    /// Import a STIX object, create it, read it back and export it again
    fn round_trip(original: &Value) -> Value {
        let imported = from_stix2(original, &ImportExtras::new()).unwrap();
        let type_ = imported.input.get_str("type");
        let entity_type = type_.unwrap_or(imported.kind.as_ref()).to_string();
        let mutation = policy(imported.kind).create.unwrap().variant(type_).unwrap().mutation;

        let transport = ScriptedTransport::new().respond(json!({mutation: {
            "id": "internal-1",
            "standard_id": original["id"],
            "entity_type": entity_type,
            "parent_types": ["Stix-Domain-Object"]
        }}));
        let created = Repository::new(&transport)
            .create(imported.kind, imported.input)
            .unwrap();
        assert_eq!(created.standard_id(), original["id"].as_str());

        let entity = stored(&entity_type, transport.last().variable("input"));
        to_stix2(&entity, &ExportOptions::new()).unwrap().unwrap().object
    }

    #[test]
    fn round_trip_of_every_exportable_kind() {
        let originals = [
            json!({"type": "attack-pattern", "id": "attack-pattern--7e150503-88e7-4861-866b-ff1ac82c4475",
                "name": "Phishing", "aliases": ["Spearphishing"], "x_mitre_id": "T1566"}),
            json!({"type": "campaign", "id": "campaign--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f",
                "name": "Operation Ghost", "objective": "Espionage", "first_seen": "2019-01-01T00:00:00.000Z"}),
            json!({"type": "course-of-action", "id": "course-of-action--2a8de25c-f743-4348-b101-3ee33ab5871b",
                "name": "Patch", "x_opencti_aliases": ["Update"], "x_mitre_id": "M1051"}),
            json!({"type": "identity", "id": "identity--7b82b010-b1c0-4dae-981f-7756374a17df",
                "name": "ACME", "identity_class": "organization", "x_opencti_reliability": "B",
                "x_opencti_aliases": ["Acme Corp"], "contact_information": "soc@acme.example"}),
            json!({"type": "identity", "id": "identity--0f3a3a05-5bd2-4b4c-8f1e-6f0a2e5b1c11",
                "name": "Jane Doe", "identity_class": "individual", "x_opencti_firstname": "Jane"}),
            json!({"type": "identity", "id": "identity--3c0d5a1e-9b2f-4e4e-a6a1-0c1d2e3f4a5b",
                "name": "Finance", "identity_class": "class", "description": "Banks and insurers"}),
            json!({"type": "identity", "id": "identity--5d4c3b2a-1f0e-4d9c-8b7a-6f5e4d3c2b1a",
                "name": "SCADA", "identity_class": "system", "roles": ["control"]}),
            json!({"type": "incident", "id": "incident--a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d",
                "name": "Ransomware outbreak", "last_seen": "2021-06-01T00:00:00.000Z"}),
            json!({"type": "indicator", "id": "indicator--8c5d1d7a-2f1f-4d8b-9d2c-5a2e8b6f7c10",
                "name": "C2 domain", "pattern": "[domain-name:value = 'evil.example']", "pattern_type": "stix",
                "valid_from": "2020-01-01T00:00:00.000Z", "x_opencti_score": 80, "x_opencti_detection": true,
                "x_opencti_main_observable_type": "Domain-Name"}),
            json!({"type": "infrastructure", "id": "infrastructure--38c47d93-d984-4fd9-b87b-d69d0841628d",
                "name": "Botnet", "infrastructure_types": ["botnet"]}),
            json!({"type": "intrusion-set", "id": "intrusion-set--4e78f46f-a023-4e5f-bc24-71b3ca22ec29",
                "name": "APT28", "aliases": ["Sofacy"], "goals": ["espionage"], "resource_level": "government"}),
            json!({"type": "location", "id": "location--a6e9345f-5a15-4c29-8bb3-7dcc5d168d64", "city": "Paris"}),
            json!({"type": "location", "id": "location--5acd8b26-51c2-4608-86ed-e9edd43ad971", "country": "France"}),
            json!({"type": "location", "id": "location--bc9e5a0d-5a8d-4e3f-9f6b-1a2c3d4e5f60",
                "region": "western-europe"}),
            json!({"type": "location", "id": "location--1b2c3d4e-5f60-4a7b-8c9d-0e1f2a3b4c5e",
                "name": "HQ", "latitude": 48.8566, "longitude": 2.3522}),
            json!({"type": "malware", "spec_version": "2.1", "id": "malware--31b940d4-6f7f-459a-80ea-9c1f17b5891b",
                "created": "2019-05-10T12:00:00.000Z", "modified": "2019-05-11T12:00:00.000Z",
                "name": "TrickBot", "description": "Banking trojan using `injects`", "aliases": ["TrickLoader"],
                "malware_types": ["trojan"], "is_family": true, "x_opencti_id": "internal-1"}),
            json!({"type": "note", "id": "note--0c7b5b88-8ff7-4a4d-aa9d-feb398cd0061",
                "abstract": "Summary", "content": "Long content", "authors": ["analyst"]}),
            json!({"type": "observed-data", "id": "observed-data--b67d30ff-02ac-498a-92f9-32f845f448cf",
                "first_observed": "2020-01-01T00:00:00.000Z", "last_observed": "2020-01-02T00:00:00.000Z",
                "number_observed": 3}),
            json!({"type": "opinion", "id": "opinion--b01efc25-77b4-4003-b18b-f6e24b5cd9f7",
                "opinion": "agree", "explanation": "Confirmed by telemetry"}),
            json!({"type": "report", "id": "report--84e4d88f-44ea-4bcd-bbf3-b2c1c320bcb3",
                "name": "Quarterly threats", "published": "2020-03-01T00:00:00.000Z",
                "report_types": ["threat-report"], "description": "Q1 review"}),
            json!({"type": "threat-actor", "id": "threat-actor--56f3f0db-b5d5-431c-ae56-c18f02caf500",
                "name": "Fancy Bear", "threat_actor_types": ["nation-state"], "sophistication": "expert"}),
            json!({"type": "tool", "id": "tool--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3e",
                "name": "Cobalt Strike", "tool_types": ["remote-access"], "tool_version": "4.0"}),
            json!({"type": "vulnerability", "id": "vulnerability--0c7b5b88-8ff7-4a4d-aa9d-feb398cd0062",
                "name": "CVE-2021-44228", "x_opencti_base_score": 10.0, "x_opencti_base_severity": "CRITICAL",
                "x_opencti_attack_vector": "NETWORK"}),
            json!({"type": "marking-definition", "spec_version": "2.1",
                "id": "marking-definition--d7a8b7c6-5e4f-4a3b-9c2d-1e0f9a8b7c6d", "name": "Copyright ACME",
                "definition_type": "statement", "definition": {"statement": "Copyright ACME"},
                "created": "2020-01-01T00:00:00.000Z"}),
        ];

        for original in &originals {
            let exported = round_trip(original);
            for (key, value) in original.as_object().unwrap() {
                assert_eq!(exported.get(key), Some(value), "{} {key}", original["id"]);
            }
        }

        let exportable: Vec<EntityKind> = EntityKind::all().filter(|kind| profile_of(*kind).is_some()).collect();
        for kind in exportable {
            assert!(
                originals
                    .iter()
                    .any(|original| profile_for_stix_type(original["type"].as_str().unwrap())
                        .is_some_and(|profile| profile.kind == kind)),
                "{kind} is not covered"
            );
        }
    }

    #[test]
    fn round_trip_of_a_tlp_marking() {
        let original = json!({
            "type": "marking-definition",
            "spec_version": "2.1",
            "id": "marking-definition--5e57c739-391a-4eb3-b6be-7d15ca92d5ed",
            "name": "TLP:RED",
            "definition_type": "tlp",
            "definition": {"tlp": "red"},
            "x_opencti_order": 4
        });
        let imported = from_stix2(&original, &ImportExtras::new()).unwrap();
        assert_eq!(imported.kind, EntityKind::MarkingDefinition);
        assert_eq!(imported.input.get_str("definition_type"), Some("TLP"));
        assert_eq!(imported.input.get_str("definition"), Some("TLP:RED"));

        let input = Value::Object(imported.input.attributes);
        let exported = to_stix2(&stored("Marking-Definition", &input), &ExportOptions::new())
            .unwrap()
            .unwrap();
        for (key, value) in original.as_object().unwrap() {
            assert_eq!(exported.object.get(key), Some(value), "{key}");
        }
    }

    #[test]
    fn markings_are_canonicalized_on_import() {
        let legacy = json!({
            "type": "marking-definition",
            "id": "marking-definition--f88d31f6-486f-44da-b317-01333bde0b82",
            "definition_type": "tlp",
            "definition": {"tlp": "amber"},
            "x_opencti_level": 3
        });
        let input = from_stix2(&legacy, &ImportExtras::new()).unwrap().input;
        assert_eq!(input.get_str("definition"), Some("TLP:AMBER"));
        assert_eq!(input.get("x_opencti_order"), Some(&json!(3)));
        assert_eq!(input.get_str("stix_id"), legacy["id"].as_str());

        let statement = json!({
            "type": "marking-definition",
            "definition_type": "statement",
            "definition": {"statement": "Copyright ACME"}
        });
        let input = from_stix2(&statement, &ImportExtras::new()).unwrap().input;
        assert_eq!(input.get_str("definition_type"), Some("statement"));
        assert_eq!(input.get_str("definition"), Some("Copyright ACME"));
        assert_eq!(input.get("x_opencti_order"), Some(&json!(0)));
    }

    #[test]
    fn location_kind_is_inferred() {
        let cases = [
            (json!({"type": "location", "city": "Paris"}), "Paris", "City"),
            (json!({"type": "location", "country": "France"}), "France", "Country"),
            (json!({"type": "location", "region": "western-europe"}), "western-europe", "Region"),
            (json!({"type": "location", "name": "HQ", "latitude": 48.8}), "HQ", "Position"),
            (
                json!({"type": "location", "name": "Lyon", "country": "France", "x_opencti_location_type": "City"}),
                "Lyon",
                "City",
            ),
        ];
        for (stix, name, location_type) in cases {
            let imported = from_stix2(&stix, &ImportExtras::new()).unwrap();
            assert_eq!(imported.kind, EntityKind::Location);
            assert_eq!(imported.input.get_str("name"), Some(name));
            assert_eq!(imported.input.get_str("type"), Some(location_type));
            assert_eq!(imported.input.get_str("description"), Some(""));
        }

        let nameless = json!({"type": "location", "latitude": 48.8, "longitude": 2.3});
        assert!(matches!(
            from_stix2(&nameless, &ImportExtras::new()),
            Err(Error::MissingParameter { .. })
        ));
    }

    #[test]
    fn identity_import() {
        let classes = [
            (Some("individual"), "Individual"),
            (Some("class"), "Sector"),
            (Some("system"), "System"),
            (Some("organization"), "Organization"),
            (None, "Organization"),
        ];
        for (identity_class, identity_type) in classes {
            let mut stix = json!({"type": "identity", "name": "ACME"});
            if let Some(identity_class) = identity_class {
                stix["identity_class"] = json!(identity_class);
            }
            let input = from_stix2(&stix, &ImportExtras::new()).unwrap().input;
            assert_eq!(input.get_str("type"), Some(identity_type));
            assert_eq!(input.get("identity_class"), None);
        }

        let stix = json!({
            "type": "identity",
            "id": "identity--7b82b010-b1c0-4dae-981f-7756374a17df",
            "identity_class": "organization",
            "name": "ACME",
            "description": "Runs <code>acme.exe</code>",
            "x_mitre_aliases": ["Acme Corp"],
            "extensions": {OPENCTI_EXTENSION_ID: {"extension_type": "property-extension", "reliability": "A"}}
        });
        let extras = ImportExtras::new()
            .created_by("identity-0")
            .markings(&["marking-1"])
            .labels(&["label-1", "label-2"])
            .kill_chain_phases(&["phase-1"]);
        let input = from_stix2(&stix, &extras).unwrap().input;
        assert_eq!(input.get_str("description"), Some("Runs `acme.exe`"));
        assert_eq!(input.get("x_opencti_aliases"), Some(&json!(["Acme Corp"])));
        assert_eq!(input.get_str("x_opencti_reliability"), Some("A"));
        assert_eq!(input.get_str("createdBy"), Some("identity-0"));
        assert_eq!(input.get("objectLabel"), Some(&json!(["label-1", "label-2"])));
        assert_eq!(input.get("objectMarking"), Some(&json!(["marking-1"])));
        // Identities hold no kill-chain phases
        assert_eq!(input.get("killChainPhases"), None);
    }

    #[test]
    fn unknown_types_are_rejected() {
        let result = from_stix2(&json!({"type": "x-custom-thing", "name": "x"}), &ImportExtras::new());
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
        let result = from_stix2(&json!({"name": "untyped"}), &ImportExtras::new());
        assert!(matches!(result, Err(Error::MissingParameter { .. })));

        let label = Entity::from_graphql(json!({"id": "label-1", "entity_type": "Label", "value": "apt"})).unwrap();
        assert!(matches!(
            to_stix2(&label, &ExportOptions::new()),
            Err(Error::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn full_export() {
        let export = to_stix2(&malware(), &ExportOptions::new()).unwrap().unwrap();
        let object = &export.object;

        assert_eq!(object["id"], json!("malware--fa1d6f28-2fbc-4e1c-b2fb-1c6b2bd8a5b0"));
        assert_eq!(object["spec_version"], json!("2.1"));
        assert_eq!(object["x_opencti_id"], json!("malware-1"));
        assert_eq!(object["labels"], json!(["malware"]));
        assert_eq!(object["created"], json!("2020-01-01T10:00:00.000Z"));
        assert_eq!(object["modified"], json!("2020-01-02T10:00:00.500Z"));
        assert_eq!(object["first_seen"], json!("2014-06-01T00:00:00.000Z"));
        assert_eq!(object.get("description"), None);
        assert_eq!(
            object["created_by_ref"],
            json!("identity--7b82b010-b1c0-4dae-981f-7756374a17df")
        );
        assert_eq!(
            object["object_marking_refs"],
            json!(["marking-definition--5e57c739-391a-4eb3-b6be-7d15ca92d5ed"])
        );
        assert_eq!(
            object["external_references"],
            json!([{"source_name": "mitre-attack", "external_id": "S0367", "url": "https://attack.mitre.org/software/S0367"}])
        );
        assert_eq!(
            object["kill_chain_phases"],
            json!([{"kill_chain_name": "mitre-attack", "phase_name": "initial-access", "x_opencti_order": 1}])
        );

        assert_eq!(export.related.len(), 2);
        let author = &export.related[0];
        assert_eq!(author["type"], json!("identity"));
        assert_eq!(author["identity_class"], json!("organization"));
        assert_eq!(author["x_opencti_reliability"], json!("B"));
        let marking = &export.related[1];
        assert_eq!(marking["definition_type"], json!("tlp"));
        assert_eq!(marking["definition"], json!({"tlp": "red"}));
        assert_eq!(marking["name"], json!("TLP:RED"));
    }

    #[test]
    fn simple_export_only_references() {
        let options = ExportOptions::new().mode(ExportMode::Simple);
        let export = to_stix2(&malware(), &options).unwrap().unwrap();
        assert!(export.related.is_empty());
        assert!(export.object.get("created_by_ref").is_some());
    }

    #[test]
    fn export_is_deterministic() {
        let first = to_stix2(&malware(), &ExportOptions::new()).unwrap().unwrap();
        let second = to_stix2(&malware(), &ExportOptions::new()).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.objects()).unwrap(),
            serde_json::to_string(&second.objects()).unwrap()
        );
        let keys: Vec<&String> = first.object.as_object().unwrap().keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn containers_and_renamed_attributes() {
        let note = Entity::from_graphql(json!({
            "id": "note-1",
            "standard_id": "note--0c7b5b88-8ff7-4a4d-aa9d-feb398cd0061",
            "entity_type": "Note",
            "attribute_abstract": "Summary",
            "content": "Long content",
            "objectLabel": {"edges": [{"node": {"id": "label-1", "value": "triage"}}]},
            "objects": {"edges": [
                {"node": {"id": "malware-1", "standard_id": "malware--fa1d6f28-2fbc-4e1c-b2fb-1c6b2bd8a5b0", "entity_type": "Malware"}}
            ]}
        }))
        .unwrap();
        let export = to_stix2(&note, &ExportOptions::new()).unwrap().unwrap();
        assert_eq!(export.object["abstract"], json!("Summary"));
        assert_eq!(export.object.get("attribute_abstract"), None);
        assert_eq!(export.object["labels"], json!(["triage"]));
        assert_eq!(
            export.object["object_refs"],
            json!(["malware--fa1d6f28-2fbc-4e1c-b2fb-1c6b2bd8a5b0"])
        );

        let city = Entity::from_graphql(json!({
            "id": "city-1",
            "standard_id": "location--a6e9345f-5a15-4c29-8bb3-7dcc5d168d64",
            "entity_type": "City",
            "name": "Paris"
        }))
        .unwrap();
        let export = to_stix2(&city, &ExportOptions::new()).unwrap().unwrap();
        assert_eq!(export.object["type"], json!("location"));
        assert_eq!(export.object["x_opencti_location_type"], json!("City"));
        assert_eq!(export.object["city"], json!("Paris"));
        let reimported = from_stix2(&export.object, &ImportExtras::new()).unwrap();
        assert_eq!(reimported.input.get_str("type"), Some("City"));
    }

    #[test]
    fn marking_ceiling() {
        let entity = malware();
        let allowed = |ceiling: MarkingCeiling| {
            to_stix2(&entity, &ExportOptions::new().max_marking_definition(ceiling))
                .unwrap()
                .is_some()
        };
        assert!(!allowed(MarkingCeiling::new("TLP", 2)));
        assert!(allowed(MarkingCeiling::new("TLP", 4)));
        // Markings of another definition type do not restrict the export
        assert!(allowed(MarkingCeiling::new("PAP", 0)));

        let unmarked = Entity::from_graphql(json!({
            "id": "tool-1",
            "standard_id": "tool--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f",
            "entity_type": "Tool",
            "name": "Cobalt Strike",
            "objectMarking": {"edges": []}
        }))
        .unwrap();
        let options = ExportOptions::new().max_marking_definition(MarkingCeiling::new("TLP", 0));
        assert!(to_stix2(&unmarked, &options).unwrap().is_some());

        let red = Entity::from_graphql(red_marking()).unwrap();
        assert_eq!(MarkingCeiling::from_marking(&red).unwrap(), MarkingCeiling::new("TLP", 4));
    }

    #[test]
    fn bundles_are_deterministic() {
        let export = to_stix2(&malware(), &ExportOptions::new()).unwrap().unwrap();
        let bundle = export.to_bundle();
        assert_eq!(bundle.object_type, "bundle");
        assert!(bundle.id.starts_with("bundle--"));
        assert_eq!(bundle.objects.len(), 3);
        assert_eq!(bundle.objects[0], export.object);
        assert_eq!(bundle, export.to_bundle());

        let mut again = export.to_bundle();
        again.add(export.related[0].clone());
        assert_eq!(again.objects.len(), 3);

        let value = bundle.to_value().unwrap();
        assert_eq!(value["type"], json!("bundle"));
    }

    #[test]
    fn helpers() {
        assert_eq!(convert_markdown("<code>a</code> and <code>b</code>"), "`a` and `b`");

        let stix: Map<String, Value> = serde_json::from_value(json!({
            "aliases": ["a"],
            "x_mitre_aliases": ["m"],
            "x_opencti_aliases": null
        }))
        .unwrap();
        assert_eq!(pick_aliases(&stix), Some(json!(["m"])));
        assert_eq!(pick_aliases(&Map::new()), None);
    }
}
