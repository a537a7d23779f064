//! Unit file templates.
//!
//! A template is systemd unit file text with `{{name}}`, `{{version}}`,
//! `{{image_prefix}}` and `{{timestamp}}` placeholders. Rendering
//! substitutes the placeholders and converts the resulting file into the
//! ordered option list fleet expects when creating a unit.

use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::types::UnitOption;

/// Docker unit registering itself as a vulcand upstream endpoint in etcd.
const DOCKER_VULCAND_TEMPLATE: &str = r#"
[Unit]
Description={{name}}-{{version}}-{{timestamp}}
After=docker.service

[Service]
EnvironmentFile=/etc/environment
User=core
TimeoutStartSec=0
ExecStartPre=/usr/bin/docker pull {{image_prefix}}/{{name}}:{{version}}
ExecStartPre=-/usr/bin/docker rm -f {{name}}-{{version}}-{{timestamp}}-%i
ExecStart=/usr/bin/docker run --name {{name}}-{{version}}-{{timestamp}}-%i -p 3000 {{image_prefix}}/{{name}}:{{version}}
ExecStartPost=/bin/sh -c "sleep 10; /usr/bin/etcdctl set /vulcand/upstreams/{{name}}/endpoints/{{name}}-{{version}}-{{timestamp}}-%i http://$COREOS_PRIVATE_IPV4:$(echo $(/usr/bin/docker port {{name}}-{{version}}-{{timestamp}}-%i 3000) | cut -d ':' -f 2)"
ExecStop=/bin/sh -c "/usr/bin/etcdctl rm '/vulcand/upstreams/{{name}}/endpoints/{{name}}-{{version}}-{{timestamp}}-%i' ; /usr/bin/docker rm -f {{name}}-{{version}}-{{timestamp}}-%i"
"#;

/// Values substituted into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitContext<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub image_prefix: &'a str,
    pub timestamp: &'a str,
}

/// A unit file template.
#[derive(Debug, Clone)]
pub struct UnitTemplate {
    name: String,
    content: String,
}

impl Default for UnitTemplate {
    fn default() -> Self {
        Self {
            name: "docker-vulcand".to_string(),
            content: DOCKER_VULCAND_TEMPLATE.to_string(),
        }
    }
}

impl UnitTemplate {
    /// Create a template from unit file text.
    ///
    /// The text is rendered once with placeholder values so that malformed
    /// templates are rejected up front rather than on the first deploy.
    pub fn new(name: &str, content: &str) -> CoreResult<Self> {
        let template = Self {
            name: name.to_string(),
            content: content.to_string(),
        };
        template.render(&UnitContext {
            name: "service",
            version: "version",
            image_prefix: "prefix",
            timestamp: "timestamp",
        })?;
        Ok(template)
    }

    /// Load a template from a file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "custom".to_string());
        Self::new(&name, &content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitute the placeholders and return the unit file text.
    pub fn generate(&self, ctx: &UnitContext<'_>) -> String {
        self.content
            .replace("{{name}}", ctx.name)
            .replace("{{version}}", ctx.version)
            .replace("{{image_prefix}}", ctx.image_prefix)
            .replace("{{timestamp}}", ctx.timestamp)
    }

    /// Render the template into fleet unit options, in file order.
    pub fn render(&self, ctx: &UnitContext<'_>) -> CoreResult<Vec<UnitOption>> {
        parse_unit_file(&self.generate(ctx))
    }
}

/// Parse systemd unit file text into `(section, name, value)` options.
fn parse_unit_file(text: &str) -> CoreResult<Vec<UnitOption>> {
    let mut options = Vec::new();
    let mut section: Option<&str> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let header = header.strip_suffix(']').ok_or_else(|| CoreError::Template {
                line: idx + 1,
                reason: format!("unterminated section header: {line}"),
            })?;
            section = Some(header.trim());
            continue;
        }

        let Some(current) = section else {
            return Err(CoreError::Template {
                line: idx + 1,
                reason: "option outside of a section".to_string(),
            });
        };
        let (key, value) = line.split_once('=').ok_or_else(|| CoreError::Template {
            line: idx + 1,
            reason: format!("expected key=value, got: {line}"),
        })?;
        options.push(UnitOption::new(current, key.trim(), value.trim()));
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> UnitContext<'static> {
        UnitContext {
            name: "carousel",
            version: "abc123",
            image_prefix: "mmmhm",
            timestamp: "2006.01.02-15.04.05",
        }
    }

    #[test]
    fn default_template_renders_in_order() {
        let options = UnitTemplate::default().render(&ctx()).unwrap();

        assert_eq!(
            options[0],
            UnitOption::new("Unit", "Description", "carousel-abc123-2006.01.02-15.04.05")
        );
        assert_eq!(options[1], UnitOption::new("Unit", "After", "docker.service"));
        assert_eq!(options[2].section, "Service");

        let pulls: Vec<&UnitOption> = options.iter().filter(|o| o.name == "ExecStartPre").collect();
        assert_eq!(pulls.len(), 2);
        assert_eq!(pulls[0].value, "/usr/bin/docker pull mmmhm/carousel:abc123");
    }

    #[test]
    fn keeps_systemd_specifiers() {
        let options = UnitTemplate::default().render(&ctx()).unwrap();
        let start = options.iter().find(|o| o.name == "ExecStart").unwrap();
        assert!(start.value.contains("--name carousel-abc123-2006.01.02-15.04.05-%i"));
    }

    #[test]
    fn value_may_contain_equals() {
        let template = UnitTemplate::new("env", "[Service]\nEnvironment=FOO=bar\n").unwrap();
        let options = template.render(&ctx()).unwrap();
        assert_eq!(options, vec![UnitOption::new("Service", "Environment", "FOO=bar")]);
    }

    #[test]
    fn skips_comments() {
        let source = "# header\n[Unit]\n; note\nDescription={{name}}\n";
        let template = UnitTemplate::new("c", source).unwrap();
        let options = template.render(&ctx()).unwrap();
        assert_eq!(options, vec![UnitOption::new("Unit", "Description", "carousel")]);
    }

    #[test]
    fn rejects_option_outside_section() {
        let err = UnitTemplate::new("bad", "Description=x\n").unwrap_err();
        assert!(matches!(err, CoreError::Template { line: 1, .. }));
    }

    #[test]
    fn rejects_line_without_equals() {
        let err = UnitTemplate::new("bad", "[Unit]\nnonsense\n").unwrap_err();
        assert!(matches!(err, CoreError::Template { line: 2, .. }));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("web.service");
        std::fs::write(&path, "[Unit]\nDescription={{name}}-{{version}}\n").unwrap();

        let template = UnitTemplate::from_file(&path).unwrap();
        assert_eq!(template.name(), "web");
        let options = template.render(&ctx()).unwrap();
        assert_eq!(options[0].value, "carousel-abc123");
    }
}
