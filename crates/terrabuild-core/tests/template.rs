use terrabuild_core::template::{capitalize, interpolate, TemplateContext, DEFAULT_ARCHIVE_NAME};

#[test]
fn test_default_archive_name() {
    let ctx = TemplateContext::new("terra", "6.0.0", "fabric");
    assert_eq!(
        interpolate(DEFAULT_ARCHIVE_NAME, &ctx).unwrap(),
        "Terra-6.0.0.jar"
    );
}

#[test]
fn test_all_variables() {
    let ctx = TemplateContext::new("terra", "6.0.0", "bukkit");
    assert_eq!(
        interpolate("{{name}}-{{ platform }}-{{version}}", &ctx).unwrap(),
        "terra-bukkit-6.0.0"
    );
}

#[test]
fn test_custom_variable() {
    let mut ctx = TemplateContext::new("terra", "6.0.0", "fabric");
    ctx.set("mc", "1.18.2");
    assert_eq!(
        interpolate("{{Name}}-{{mc}}.jar", &ctx).unwrap(),
        "Terra-1.18.2.jar"
    );
}

#[test]
fn test_unknown_variable_is_error() {
    let ctx = TemplateContext::new("terra", "6.0.0", "fabric");
    let err = interpolate("{{flavor}}.jar", &ctx).unwrap_err();
    assert!(err.to_string().contains("flavor"), "{err}");
}

#[test]
fn test_unterminated_is_error() {
    let ctx = TemplateContext::new("terra", "6.0.0", "fabric");
    assert!(interpolate("{{Name", &ctx).is_err());
}

#[test]
fn test_capitalize() {
    assert_eq!(capitalize("terra"), "Terra");
    assert_eq!(capitalize("Terra"), "Terra");
    assert_eq!(capitalize("élan"), "Élan");
    assert_eq!(capitalize(""), "");
}
