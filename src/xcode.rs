//! xcodebuild argument assembly and build-settings extraction.

use regex_lite::Regex;

/// Options shared by every xcodebuild invocation.
///
/// Empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XcodebuildArgs {
    pub project: Option<String>,
    pub workspace: Option<String>,
    pub scheme: Option<String>,
    pub destination: Option<String>,
    pub configuration: Option<String>,
    pub sdk: Option<String>,
    pub derived_data_path: Option<String>,
    pub extra_args: Vec<String>,
}

impl XcodebuildArgs {
    /// Render as argument list (without the executable or action).
    ///
    /// A workspace takes precedence over a project when both are given.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(workspace) = present(&self.workspace) {
            push_pair(&mut args, "-workspace", workspace);
        } else if let Some(project) = present(&self.project) {
            push_pair(&mut args, "-project", project);
        }

        let flags = [
            ("-scheme", &self.scheme),
            ("-destination", &self.destination),
            ("-configuration", &self.configuration),
            ("-sdk", &self.sdk),
            ("-derivedDataPath", &self.derived_data_path),
        ];
        for (flag, value) in flags {
            if let Some(value) = present(value) {
                push_pair(&mut args, flag, value);
            }
        }

        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// `-workspace W` or `-project P` (workspace preferred), used by `-list`.
pub fn container_args(project: &Option<String>, workspace: &Option<String>) -> Vec<String> {
    XcodebuildArgs {
        project: project.clone(),
        workspace: workspace.clone(),
        ..XcodebuildArgs::default()
    }
    .to_args()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn push_pair(args: &mut Vec<String>, flag: &str, value: &str) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

/// Extract `KEY = value` from `xcodebuild -showBuildSettings` output.
///
/// Returns the first match, trimmed. Keys are matched whole, so
/// `PRODUCT_BUNDLE_IDENTIFIER` does not match `INFOPLIST_KEY_PRODUCT_BUNDLE_IDENTIFIER`.
pub fn extract_setting(output: &str, key: &str) -> Option<String> {
    let pattern = format!(r"(?m)^[ \t]*{}[ \t]*=[ \t]*(.+)$", regex_lite::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The built `.app` bundle described by build settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppBundle {
    pub target_name: String,
    pub path: String,
}

/// `BUILT_PRODUCTS_DIR/TARGET_NAME.app`, if both settings are present.
pub fn app_bundle(settings_output: &str) -> Option<AppBundle> {
    let products_dir = extract_setting(settings_output, "BUILT_PRODUCTS_DIR")?;
    let target_name = extract_setting(settings_output, "TARGET_NAME")?;
    Some(AppBundle {
        path: format!("{}/{}.app", products_dir, target_name),
        target_name,
    })
}

/// Keep the lines containing `filter`, case-insensitively.
pub fn filter_lines(output: &str, filter: &str) -> String {
    let needle = filter.to_lowercase();
    output
        .lines()
        .filter(|line| line.to_lowercase().contains(&needle))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = "\
Build settings for action build and target MyApp:
    BUILT_PRODUCTS_DIR = /Users/dev/Library/Developer/Xcode/DerivedData/MyApp-abc/Build/Products/Debug-iphonesimulator
    INFOPLIST_KEY_PRODUCT_BUNDLE_IDENTIFIER = wrong.match
    PRODUCT_BUNDLE_IDENTIFIER = com.example.MyApp
    SDKROOT = /Applications/Xcode.app/Contents/Developer/Platforms/iPhoneSimulator.platform
    TARGET_NAME = MyApp
";

    #[test]
    fn test_workspace_preferred_over_project() {
        let args = XcodebuildArgs {
            project: Some("App.xcodeproj".to_string()),
            workspace: Some("App.xcworkspace".to_string()),
            scheme: Some("App".to_string()),
            ..Default::default()
        };
        assert_eq!(args.to_args(), vec!["-workspace", "App.xcworkspace", "-scheme", "App"]);
    }

    #[test]
    fn test_full_argument_order() {
        let args = XcodebuildArgs {
            project: Some("App.xcodeproj".to_string()),
            workspace: None,
            scheme: Some("App".to_string()),
            destination: Some("platform=iOS Simulator,name=iPhone 16".to_string()),
            configuration: Some("Release".to_string()),
            sdk: Some("iphonesimulator".to_string()),
            derived_data_path: Some("/tmp/dd".to_string()),
            extra_args: vec!["-quiet".to_string()],
        };
        assert_eq!(
            args.to_args(),
            vec![
                "-project",
                "App.xcodeproj",
                "-scheme",
                "App",
                "-destination",
                "platform=iOS Simulator,name=iPhone 16",
                "-configuration",
                "Release",
                "-sdk",
                "iphonesimulator",
                "-derivedDataPath",
                "/tmp/dd",
                "-quiet",
            ]
        );
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let args = XcodebuildArgs {
            workspace: Some(String::new()),
            project: Some("App.xcodeproj".to_string()),
            configuration: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(args.to_args(), vec!["-project", "App.xcodeproj"]);
    }

    #[test]
    fn test_container_args_empty() {
        assert!(container_args(&None, &None).is_empty());
    }

    #[test]
    fn test_extract_setting() {
        assert_eq!(
            extract_setting(SETTINGS, "PRODUCT_BUNDLE_IDENTIFIER").as_deref(),
            Some("com.example.MyApp")
        );
        assert_eq!(extract_setting(SETTINGS, "TARGET_NAME").as_deref(), Some("MyApp"));
        assert_eq!(extract_setting(SETTINGS, "MISSING_KEY"), None);
    }

    #[test]
    fn test_app_bundle() {
        let bundle = app_bundle(SETTINGS).unwrap();
        assert_eq!(bundle.target_name, "MyApp");
        assert!(bundle.path.ends_with("/Debug-iphonesimulator/MyApp.app"));
    }

    #[test]
    fn test_app_bundle_missing_settings() {
        assert_eq!(app_bundle("TARGET_NAME = MyApp\n"), None);
    }

    #[test]
    fn test_filter_lines_case_insensitive() {
        let filtered = filter_lines(SETTINGS, "sdkroot");
        assert_eq!(filtered.lines().count(), 1);
        assert!(filtered.contains("SDKROOT"));
        assert_eq!(filter_lines(SETTINGS, "nothing-here"), "");
    }
}
