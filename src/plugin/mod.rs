//! Format-scoped renderer plugins and their registry.
//!
//! Plugins attach to renderer instances at runtime to augment behavior
//! without modifying renderer code. Lifecycle per plugin:
//! unregistered → registered → initialized (≥1 attached renderer) →
//! unregistered. The registry exclusively owns registrations; renderers are
//! referenced by [`RendererId`], never owned.
//!
//! The registry holds shared mutable state behind `&mut self`, so the
//! borrow checker enforces the single-writer discipline; wrap it in a
//! `Mutex` to share across threads.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::render::{BidirectionalRenderer, Format, Renderer, RendererId};

/// A cross-cutting renderer extension.
///
/// `initialize` is statically required; `detach` and `cleanup` are optional
/// hooks invoked while unregistering.
pub trait RendererPlugin {
    /// Globally unique id among registered plugins.
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    /// Formats this plugin can attach to. Must be non-empty.
    fn compatible_formats(&self) -> &[Format];

    /// Called once per plugin lifetime, on the first renderer attach.
    fn initialize(&mut self, renderer: &dyn BidirectionalRenderer) -> Result<()>;

    /// Called for each attached renderer while unregistering.
    fn detach(&mut self, _renderer: RendererId) {}

    /// Called last while unregistering.
    fn cleanup(&mut self) {}
}

/// Registry-internal bookkeeping for one registered plugin.
struct PluginRegistration {
    plugin: Box<dyn RendererPlugin>,
    initialized: bool,
    attached: HashSet<RendererId>,
    registered_at: DateTime<Utc>,
}

/// Summary of one registered plugin.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub compatible_formats: Vec<Format>,
    pub initialized: bool,
    pub attached_renderers: usize,
    pub registered_at: DateTime<Utc>,
}

/// Aggregate registry counts. No side effects to compute.
#[derive(Debug, Clone, Default)]
pub struct RegistryStatistics {
    pub total: usize,
    pub initialized: usize,
    pub by_format: HashMap<Format, usize>,
    pub oldest_registration: Option<DateTime<Utc>>,
    pub newest_registration: Option<DateTime<Utc>>,
}

/// Outcome of a [`PluginRegistry::discover`] pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub loaded: Vec<String>,
    pub skipped: Vec<String>,
}

/// A provider of candidate plugins, abstracting host-dependent loading so
/// registry logic stays host-independent.
pub trait PluginSource {
    /// Names of candidate plugins this source might provide.
    fn candidates(&self) -> Vec<String>;

    /// Load one candidate. `None` means the optional plugin is unavailable,
    /// which is not an error.
    fn load(&self, name: &str) -> Option<Box<dyn RendererPlugin>>;
}

/// Manages optional renderer extensions, indexed by target format.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginRegistration>,
    by_format: HashMap<Format, Vec<String>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, validating required fields and rejecting
    /// duplicate ids. The plugin is indexed under each declared compatible
    /// format for O(1) lookup.
    pub fn register(&mut self, plugin: Box<dyn RendererPlugin>) -> Result<()> {
        if plugin.id().is_empty() {
            return Err(Error::Plugin("plugin id must not be empty".to_string()));
        }
        if plugin.name().is_empty() || plugin.version().is_empty() {
            return Err(Error::Plugin(format!(
                "plugin `{}` must declare a name and version",
                plugin.id()
            )));
        }
        if plugin.compatible_formats().is_empty() {
            return Err(Error::Plugin(format!(
                "plugin `{}` must declare at least one compatible format",
                plugin.id()
            )));
        }
        let id = plugin.id().to_string();
        if self.plugins.contains_key(&id) {
            return Err(Error::Plugin(format!("plugin `{id}` is already registered")));
        }

        for &format in plugin.compatible_formats() {
            self.by_format.entry(format).or_default().push(id.clone());
        }
        self.plugins.insert(
            id,
            PluginRegistration {
                plugin,
                initialized: false,
                attached: HashSet::new(),
                registered_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Unregister a plugin: detach every attached renderer, run `cleanup`,
    /// drop the format index entries and the registration.
    pub fn unregister(&mut self, id: &str) -> Result<()> {
        let mut registration = self
            .plugins
            .remove(id)
            .ok_or_else(|| Error::Plugin(format!("unknown plugin `{id}`")))?;

        let attached: Vec<RendererId> = registration.attached.drain().collect();
        for renderer in attached {
            registration.plugin.detach(renderer);
        }
        registration.plugin.cleanup();

        for ids in self.by_format.values_mut() {
            ids.retain(|existing| existing != id);
        }
        self.by_format.retain(|_, ids| !ids.is_empty());
        Ok(())
    }

    /// Attach a renderer to a plugin. The plugin's `initialize` hook fires
    /// only on the first attach of its lifetime; the renderer is added to
    /// the tracking set on every call.
    pub fn initialize_plugin(
        &mut self,
        id: &str,
        renderer: &dyn BidirectionalRenderer,
    ) -> Result<()> {
        let registration = self
            .plugins
            .get_mut(id)
            .ok_or_else(|| Error::Plugin(format!("unknown plugin `{id}`")))?;

        let format = renderer.format();
        if !registration.plugin.compatible_formats().contains(&format) {
            return Err(Error::Plugin(format!(
                "plugin `{id}` does not support format `{format}`"
            )));
        }

        if !registration.initialized {
            registration.plugin.initialize(renderer)?;
            registration.initialized = true;
        }
        registration.attached.insert(renderer.instance_id());
        Ok(())
    }

    /// Plugins declaring compatibility with `format`. Index lookup, never a
    /// linear scan over all plugins.
    pub fn find_compatible(&self, format: Format) -> Vec<&dyn RendererPlugin> {
        self.by_format
            .get(&format)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.plugins.get(id))
                    .map(|registration| registration.plugin.as_ref())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Plugins currently attached to the given renderer instance.
    pub fn plugins_for_renderer(&self, renderer: RendererId) -> Vec<&dyn RendererPlugin> {
        self.plugins
            .values()
            .filter(|registration| registration.attached.contains(&renderer))
            .map(|registration| registration.plugin.as_ref())
            .collect()
    }

    pub fn list(&self) -> Vec<PluginInfo> {
        let mut infos: Vec<PluginInfo> = self
            .plugins
            .values()
            .map(|registration| PluginInfo {
                id: registration.plugin.id().to_string(),
                name: registration.plugin.name().to_string(),
                version: registration.plugin.version().to_string(),
                compatible_formats: registration.plugin.compatible_formats().to_vec(),
                initialized: registration.initialized,
                attached_renderers: registration.attached.len(),
                registered_at: registration.registered_at,
            })
            .collect();
        infos.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        infos
    }

    pub fn statistics(&self) -> RegistryStatistics {
        let mut by_format: HashMap<Format, usize> = HashMap::new();
        for (format, ids) in &self.by_format {
            by_format.insert(*format, ids.len());
        }
        let timestamps: Vec<DateTime<Utc>> = self
            .plugins
            .values()
            .map(|registration| registration.registered_at)
            .collect();
        RegistryStatistics {
            total: self.plugins.len(),
            initialized: self
                .plugins
                .values()
                .filter(|registration| registration.initialized)
                .count(),
            by_format,
            oldest_registration: timestamps.iter().min().copied(),
            newest_registration: timestamps.iter().max().copied(),
        }
    }

    /// Best-effort discovery over a plugin source.
    ///
    /// An unavailable candidate is skipped with a debug log; a candidate
    /// failing registration validation aborts only its own load, never the
    /// whole pass.
    pub fn discover(&mut self, source: &dyn PluginSource) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        for candidate in source.candidates() {
            match source.load(&candidate) {
                None => {
                    log::debug!("optional plugin `{candidate}` is not available");
                    report.skipped.push(candidate);
                }
                Some(plugin) => {
                    let id = plugin.id().to_string();
                    match self.register(plugin) {
                        Ok(()) => report.loaded.push(id),
                        Err(error) => {
                            log::warn!("plugin `{candidate}` failed to load: {error}");
                            report.skipped.push(candidate);
                        }
                    }
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextRenderer;

    struct CountingPlugin {
        id: String,
        formats: Vec<Format>,
        initialize_calls: usize,
        detach_calls: usize,
        cleaned_up: bool,
    }

    impl CountingPlugin {
        fn boxed(id: &str, formats: Vec<Format>) -> Box<Self> {
            Box::new(Self {
                id: id.to_string(),
                formats,
                initialize_calls: 0,
                detach_calls: 0,
                cleaned_up: false,
            })
        }
    }

    impl RendererPlugin for CountingPlugin {
        fn id(&self) -> &str {
            &self.id
        }
        fn name(&self) -> &str {
            "counting plugin"
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn compatible_formats(&self) -> &[Format] {
            &self.formats
        }
        fn initialize(&mut self, _renderer: &dyn BidirectionalRenderer) -> crate::Result<()> {
            self.initialize_calls += 1;
            Ok(())
        }
        fn detach(&mut self, _renderer: RendererId) {
            self.detach_calls += 1;
        }
        fn cleanup(&mut self) {
            self.cleaned_up = true;
        }
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = PluginRegistry::new();
        registry
            .register(CountingPlugin::boxed("p1", vec![Format::Text]))
            .unwrap();
        let error = registry
            .register(CountingPlugin::boxed("p1", vec![Format::Html]))
            .unwrap_err();
        assert!(error.to_string().contains("already registered"));
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn test_empty_formats_rejected() {
        let mut registry = PluginRegistry::new();
        let error = registry
            .register(CountingPlugin::boxed("p2", vec![]))
            .unwrap_err();
        assert!(error.to_string().contains("compatible format"));
    }

    #[test]
    fn test_initialize_fires_once_but_tracks_every_renderer() {
        let mut registry = PluginRegistry::new();
        registry
            .register(CountingPlugin::boxed("p1", vec![Format::Text]))
            .unwrap();

        let first = TextRenderer::new();
        let second = TextRenderer::new();
        registry.initialize_plugin("p1", &first).unwrap();
        registry.initialize_plugin("p1", &second).unwrap();
        registry.initialize_plugin("p1", &second).unwrap();

        let info = &registry.list()[0];
        assert!(info.initialized);
        assert_eq!(info.attached_renderers, 2);
    }

    #[test]
    fn test_format_incompatibility_fails_that_call_only() {
        use crate::markdown::MarkdownRenderer;
        let mut registry = PluginRegistry::new();
        registry
            .register(CountingPlugin::boxed("p1", vec![Format::Text]))
            .unwrap();

        let markdown = MarkdownRenderer::new();
        assert!(registry.initialize_plugin("p1", &markdown).is_err());
        // Registration is untouched
        assert_eq!(registry.list().len(), 1);
        assert!(!registry.list()[0].initialized);
    }

    #[test]
    fn test_find_compatible_uses_index() {
        let mut registry = PluginRegistry::new();
        registry
            .register(CountingPlugin::boxed("text-only", vec![Format::Text]))
            .unwrap();
        registry
            .register(CountingPlugin::boxed(
                "multi",
                vec![Format::Text, Format::Html],
            ))
            .unwrap();

        let for_html = registry.find_compatible(Format::Html);
        assert_eq!(for_html.len(), 1);
        assert_eq!(for_html[0].id(), "multi");
        assert!(registry.find_compatible(Format::Docx).is_empty());
    }

    #[test]
    fn test_unregister_unknown_fails() {
        let mut registry = PluginRegistry::new();
        assert!(registry.unregister("ghost").is_err());
    }

    #[test]
    fn test_unregister_detaches_and_cleans_up() {
        let mut registry = PluginRegistry::new();
        registry
            .register(CountingPlugin::boxed("p1", vec![Format::Text]))
            .unwrap();
        let renderer = TextRenderer::new();
        registry.initialize_plugin("p1", &renderer).unwrap();

        registry.unregister("p1").unwrap();
        assert!(registry.list().is_empty());
        assert!(registry.find_compatible(Format::Text).is_empty());
        assert!(registry
            .plugins_for_renderer(renderer.instance_id())
            .is_empty());
    }

    #[test]
    fn test_statistics() {
        let mut registry = PluginRegistry::new();
        registry
            .register(CountingPlugin::boxed("a", vec![Format::Text]))
            .unwrap();
        registry
            .register(CountingPlugin::boxed("b", vec![Format::Text, Format::Docx]))
            .unwrap();

        let stats = registry.statistics();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.initialized, 0);
        assert_eq!(stats.by_format.get(&Format::Text), Some(&2));
        assert_eq!(stats.by_format.get(&Format::Docx), Some(&1));
        assert!(stats.oldest_registration.is_some());
        assert!(stats.oldest_registration <= stats.newest_registration);
    }

    struct StubSource;

    impl PluginSource for StubSource {
        fn candidates(&self) -> Vec<String> {
            vec![
                "good".to_string(),
                "missing".to_string(),
                "invalid".to_string(),
            ]
        }

        fn load(&self, name: &str) -> Option<Box<dyn RendererPlugin>> {
            match name {
                "good" => Some(CountingPlugin::boxed("good", vec![Format::Text])),
                // Declares no formats, so registration validation rejects it
                "invalid" => Some(CountingPlugin::boxed("invalid", vec![])),
                _ => None,
            }
        }
    }

    #[test]
    fn test_discovery_isolates_failures() {
        let mut registry = PluginRegistry::new();
        let report = registry.discover(&StubSource);
        assert_eq!(report.loaded, vec!["good".to_string()]);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(registry.list().len(), 1);
    }
}
