//! Unit tests for the configuration loader

#[cfg(test)]
mod tests {
    use crate::{ConfigLoader, ConfigSource, DeploymentDescriptor, FileFormat, RawValue};
    use deployenv_core::Error;
    use std::fs;

    fn descriptor(yaml: &str) -> DeploymentDescriptor {
        FileFormat::Yaml.parse(yaml).unwrap()
    }

    #[test]
    fn test_inline_sections() {
        let descriptor = descriptor(
            r#"
custom:
  deploy:
    prefix: APP
    environments:
      default: { a: 1 }
      test: { b: foo }
    variables:
      default: { memory: 512 }
"#,
        );

        let loaded = ConfigLoader::new().load(&descriptor).unwrap();
        assert_eq!(loaded.source, ConfigSource::Inline);
        assert_eq!(loaded.prefix.as_deref(), Some("APP"));
        assert_eq!(
            loaded.environments.layer("test").unwrap()["b"],
            RawValue::Literal("foo".to_string())
        );
        assert_eq!(
            loaded.variables.default_layer().unwrap()["memory"],
            RawValue::Literal("512".to_string())
        );
    }

    #[test]
    fn test_missing_deploy_section_is_empty() {
        let descriptor = descriptor("service: orders\n");
        let loaded = ConfigLoader::new().load(&descriptor).unwrap();
        assert_eq!(loaded.source, ConfigSource::Missing);
        assert!(loaded.environments.is_empty());
        assert!(loaded.variables.is_empty());
    }

    #[test]
    fn test_file_referenced_from_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("deploy.yml"),
            "default:\n  a: 1\nprod:\n  a: 2\n",
        )
        .unwrap();

        let descriptor = descriptor(
            r#"
custom:
  deploy:
    file: deploy.yml
    environments:
      default: { ignored: true }
"#,
        );

        let loaded = ConfigLoader::new()
            .base_dir(dir.path())
            .load(&descriptor)
            .unwrap();
        assert_eq!(
            loaded.source,
            ConfigSource::File(dir.path().join("deploy.yml"))
        );
        assert!(loaded.environments.default_layer().unwrap().get("ignored").is_none());
        assert_eq!(
            loaded.environments.layer("prod").unwrap()["a"],
            RawValue::Literal("2".to_string())
        );
    }

    #[test]
    fn test_sectioned_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.json");
        fs::write(
            &path,
            r#"{"environments": {"default": {"a": "1"}}, "variables": {"prod": {"v": 2}}}"#,
        )
        .unwrap();

        let loaded = ConfigLoader::new()
            .file(Some(path.clone()))
            .load(&DeploymentDescriptor::default())
            .unwrap();
        assert_eq!(loaded.source, ConfigSource::File(path));
        assert!(loaded.environments.default_layer().is_some());
        assert!(loaded.variables.layer("prod").is_some());
    }

    #[test]
    fn test_bad_file_reference() {
        let descriptor = descriptor("custom:\n  deploy:\n    file: [a, b]\n");
        let err = ConfigLoader::new().load(&descriptor).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let descriptor = descriptor("custom:\n  deploy:\n    file: nope.yml\n");
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::new()
            .base_dir(dir.path())
            .load(&descriptor)
            .unwrap_err();
        assert!(matches!(err, Error::FileSystem { .. }));
    }
}
