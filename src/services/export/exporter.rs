//! Export orchestrator.
//!
//! One call to [`LayerExporter::export_layers`] is one run: the host tree is
//! snapshotted into a [`LayerTreeView`], the filter is configured from the
//! settings, and every element passing it is either exported as a file
//! (layers and non-empty groups) or created as a directory (empty groups).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::services::config::{BracketMode, ExportSettings, ExtensionMatchMode, ExtensionStripMode};
use crate::services::filter::{FilterOwner, LayerRule, MatchType, MissingRule, ObjectFilter};
use crate::services::fs_utils::make_dirs;
use crate::services::host::{ImageHost, RunMode, ScratchImage};
use crate::services::layer_tree::{fallback_name, ElementId, LayerTree, LayerTreeView};
use crate::services::naming::{self, SuffixPlacement};
use crate::services::overwrite::{self, OverwriteChooser};
use crate::types::errors::ExportError;

use super::compositor::{self, CompositeOptions};
use super::extensions::ExtensionRegistry;
use super::progress::ProgressSink;
use super::status::{self, AttemptContext, ExportStatus, Transition};

/// Sub-filter selecting which kinds of elements take part in the run.
pub const LAYER_TYPES_SUBFILTER: &str = "layer_types";

/// Cooperative stop flag, checked before each element.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A source layer the run got to, with what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedLayer<T> {
    pub handle: T,
    /// The file existed and the overwrite choice was to skip it.
    pub skipped: bool,
}

/// Result of a run. `layers` is filled even when `result` is an error.
#[derive(Debug)]
pub struct RunOutcome<T> {
    pub layers: Vec<ProcessedLayer<T>>,
    pub result: Result<(), ExportError>,
}

impl<T: Clone> RunOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn exported(&self) -> Vec<T> {
        self.handles(|layer| !layer.skipped)
    }

    pub fn skipped(&self) -> Vec<T> {
        self.handles(|layer| layer.skipped)
    }

    /// Every processed handle, in export order.
    pub fn exported_or_skipped(&self) -> Vec<T> {
        self.handles(|_| true)
    }

    fn handles(&self, keep: impl Fn(&ProcessedLayer<T>) -> bool) -> Vec<T> {
        self.layers
            .iter()
            .filter(|layer| keep(layer))
            .map(|layer| layer.handle.clone())
            .collect()
    }
}

#[derive(Debug)]
pub struct LayerExporter {
    settings: ExportSettings,
    initial_run_mode: RunMode,
    stop: StopHandle,
}

impl LayerExporter {
    pub fn new(settings: ExportSettings, initial_run_mode: RunMode) -> Self {
        Self {
            settings,
            initial_run_mode,
            stop: StopHandle::default(),
        }
    }

    /// Handle that stops the current run at the next element. The flag is
    /// cleared when a run starts.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn export_layers<H, C, P>(
        &self,
        host: &mut H,
        chooser: &mut C,
        progress: &mut P,
    ) -> RunOutcome<H::Handle>
    where
        H: ImageHost + ?Sized,
        C: OverwriteChooser + ?Sized,
        P: ProgressSink + ?Sized,
    {
        self.stop.reset();

        let mut run = ExportRun::<H, C, P>::new(self, chooser, progress);
        let result = run.execute(host);

        let outcome = RunOutcome {
            layers: run.layers,
            result,
        };
        match &outcome.result {
            Ok(()) => log::info!(
                "Export finished: {} exported, {} skipped",
                outcome.exported().len(),
                outcome.skipped().len()
            ),
            Err(e) if e.is_cancelled() => log::warn!("{e}"),
            Err(e) => log::error!("{e}"),
        }
        outcome
    }
}

/// Export every layer of `host` passing the filter built from `settings`.
pub fn run<H, C, P>(
    initial_run_mode: RunMode,
    host: &mut H,
    settings: &ExportSettings,
    chooser: &mut C,
    progress: &mut P,
) -> RunOutcome<H::Handle>
where
    H: ImageHost + ?Sized,
    C: OverwriteChooser + ?Sized,
    P: ProgressSink + ?Sized,
{
    LayerExporter::new(settings.clone(), initial_run_mode).export_layers(host, chooser, progress)
}

/// State of one run.
struct ExportRun<'a, H, C, P>
where
    H: ImageHost + ?Sized,
    C: ?Sized,
    P: ?Sized,
{
    settings: &'a ExportSettings,
    stop: &'a StopHandle,
    chooser: &'a mut C,
    progress: &'a mut P,
    initial_run_mode: RunMode,
    output_directory: PathBuf,
    default_extension: String,
    current_extension: String,
    extensions: ExtensionRegistry,
    status: ExportStatus,
    options: CompositeOptions,
    backgrounds: Vec<H::Handle>,
    layers: Vec<ProcessedLayer<H::Handle>>,
}

impl<'a, H, C, P> ExportRun<'a, H, C, P>
where
    H: ImageHost + ?Sized,
    C: OverwriteChooser + ?Sized,
    P: ProgressSink + ?Sized,
{
    fn new(exporter: &'a LayerExporter, chooser: &'a mut C, progress: &'a mut P) -> Self {
        let settings = &exporter.settings;
        let default_extension = settings.normalized_extension();
        Self {
            settings,
            stop: &exporter.stop,
            chooser,
            progress,
            initial_run_mode: exporter.initial_run_mode,
            output_directory: settings.output_directory.clone(),
            current_extension: default_extension.clone(),
            default_extension,
            extensions: ExtensionRegistry::new(),
            status: ExportStatus::NotExported,
            options: CompositeOptions::from(settings),
            backgrounds: Vec::new(),
            layers: Vec::new(),
        }
    }

    fn include_layer_path(&self) -> bool {
        self.settings.layer_groups_as_directories
    }

    fn execute(&mut self, host: &mut H) -> Result<(), ExportError> {
        self.settings.validate()?;

        let mut view = LayerTreeView::new(LayerTree::from_source(&*host));
        self.configure_filter(&mut view)?;

        let total = view
            .remove_rule_temp_in(LAYER_TYPES_SUBFILTER, LayerRule::IsEmptyGroup, MissingRule::Ignore)?
            .count();
        self.progress.set_total(total);
        log::info!(
            "Exporting {} of {} element(s) to {}",
            total,
            view.tree().len(),
            self.output_directory.display()
        );

        make_dirs(&self.output_directory).map_err(|e| {
            ExportError::Fatal(format!(
                "cannot create output directory {}: {e}",
                self.output_directory.display()
            ))
        })?;

        let mut scratch = ScratchImage::new(host)?;
        for id in view.ids() {
            if self.stop.is_stopped() {
                return Err(ExportError::Cancelled("stopped by user".to_string()));
            }

            if view.element(id).is_exportable() {
                let (host, image) = scratch.parts()?;
                self.export_element(&mut view, id, host, image)?;
            } else {
                self.create_empty_directory(&mut view, id)?;
            }
        }
        Ok(())
    }

    fn configure_filter(&mut self, view: &mut LayerTreeView<H::Handle>) -> Result<(), ExportError> {
        let mut layer_types = ObjectFilter::new(MatchType::Any);
        layer_types.add_rule(LayerRule::IsLayer);

        if self.settings.merge_layer_groups {
            view.filter_mut().add_rule(LayerRule::IsTopLevel);
            layer_types.add_rule(LayerRule::IsNonemptyGroup);
        }
        if self.settings.ignore_invisible {
            view.filter_mut().add_rule(LayerRule::IsPathVisible);
        }
        if self.settings.empty_directories {
            layer_types.add_rule(LayerRule::IsEmptyGroup);
        }
        view.filter_mut().add_subfilter(LAYER_TYPES_SUBFILTER, layer_types)?;

        match self.settings.square_bracketed_mode {
            BracketMode::Normal => {
                for id in view.ids() {
                    rename(view, id, naming::strip_square_brackets);
                }
            }
            BracketMode::Background => {
                let bracketed = view.add_rule_temp(LayerRule::IsEnclosedInSquareBrackets).ids();
                self.backgrounds = bracketed
                    .iter()
                    .map(|id| view.element(*id).handle().clone())
                    .collect();
                view.filter_mut().add_rule(LayerRule::IsNotEnclosedInSquareBrackets);
                log::debug!("{} background layer(s)", self.backgrounds.len());
            }
            BracketMode::Ignore => {
                view.filter_mut().add_rule(LayerRule::IsNotEnclosedInSquareBrackets);
            }
            BracketMode::IgnoreOther => {
                let bracketed = view.add_rule_temp(LayerRule::IsEnclosedInSquareBrackets).ids();
                view.filter_mut().add_rule(LayerRule::IsNotEnclosedInSquareBrackets);
                for id in view.ids() {
                    rename(view, id, naming::add_square_brackets);
                }
                for id in bracketed {
                    rename(view, id, naming::strip_square_brackets);
                }
            }
        }

        if self.settings.file_extension_mode == ExtensionMatchMode::OnlyMatchingExtension {
            view.filter_mut()
                .add_rule(LayerRule::HasMatchingFileExtension(self.default_extension.clone()));
        }
        Ok(())
    }

    fn export_element(
        &mut self,
        view: &mut LayerTreeView<H::Handle>,
        id: ElementId,
        host: &mut H,
        image: &mut H::Image,
    ) -> Result<(), ExportError> {
        let handle = view.element(id).handle().clone();
        log::debug!("Processing '{}'", view.element(id).orig_name());

        let item = compositor::prepare_layer(host, image, &handle, &self.backgrounds, self.options)?;
        let saved = self.save_element(view, id, host, image, &item);
        let removed = host.remove_layer(image, item);
        let skipped = saved?;
        removed?;

        self.progress.advance(1);
        if !skipped {
            self.extensions.record_success(&self.current_extension);
        }
        self.layers.push(ProcessedLayer { handle, skipped });
        Ok(())
    }

    /// Name the element, then save it, falling back to the default extension
    /// once if its own extension cannot be saved. Returns whether the file was
    /// skipped.
    fn save_element(
        &mut self,
        view: &mut LayerTreeView<H::Handle>,
        id: ElementId,
        host: &mut H,
        image: &H::Image,
        item: &H::Item,
    ) -> Result<bool, ExportError> {
        ensure_valid_name(view, id);
        self.strip_file_extension(view, id);
        self.apply_file_extension(view, id);
        view.finalize_name(
            id,
            &self.output_directory,
            self.include_layer_path(),
            SuffixPlacement::BeforeExtension,
        );

        let mut skipped = self.export_to_file(view, id, host, image, item, ExportStatus::NotExported)?;
        if self.status == ExportStatus::UseDefaultExtension {
            self.apply_file_extension(view, id);
            view.finalize_name(
                id,
                &self.output_directory,
                self.include_layer_path(),
                SuffixPlacement::BeforeExtension,
            );
            skipped = self.export_to_file(view, id, host, image, item, ExportStatus::UseDefaultExtension)?;
        }
        Ok(skipped)
    }

    fn export_to_file(
        &mut self,
        view: &LayerTreeView<H::Handle>,
        id: ElementId,
        host: &mut H,
        image: &H::Image,
        item: &H::Item,
        entry: ExportStatus,
    ) -> Result<bool, ExportError> {
        self.status = entry;

        let path = view.file_path(id, &self.output_directory, self.include_layer_path());
        let resolution = overwrite::resolve(&path, &mut *self.chooser)?;
        self.progress
            .set_status_text(&format!("Saving '{}'", resolution.path.display()));

        if resolution.should_skip {
            return Ok(true);
        }

        let run_mode = status::select_run_mode(
            self.initial_run_mode,
            self.extensions.get(&self.current_extension),
        );
        if let Some(parent) = resolution.path.parent() {
            make_dirs(parent)?;
        }

        self.save_once(host, image, item, &resolution.path, run_mode)?;
        if self.status == ExportStatus::ForceInteractive {
            self.save_once(host, image, item, &resolution.path, RunMode::Interactive)?;
        }
        Ok(false)
    }

    fn save_once(
        &mut self,
        host: &mut H,
        image: &H::Image,
        item: &H::Item,
        path: &Path,
        run_mode: RunMode,
    ) -> Result<(), ExportError> {
        let base_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        log::debug!("Saving {} ({run_mode:?})", path.display());

        let outcome = host.save(image, item, path, &base_name, run_mode);
        let context = AttemptContext {
            extension: &self.current_extension,
            default_extension: &self.default_extension,
            run_mode,
        };

        let next = status::transition(self.status, &context, outcome.as_ref().map(|_| ()));
        if let Some(status) = next.status() {
            self.status = status;
        }

        match next {
            Transition::Succeeded => Ok(()),
            Transition::RetryInteractive => {
                log::warn!(
                    "Saving '{base_name}' failed in {run_mode:?} mode, retrying interactively"
                );
                Ok(())
            }
            Transition::FallBackToDefaultExtension => {
                log::warn!(
                    "Cannot save '{base_name}' as \"{}\", using \"{}\" instead",
                    self.current_extension,
                    self.default_extension
                );
                self.extensions.invalidate(&self.current_extension);
                self.current_extension = self.default_extension.clone();
                Ok(())
            }
            Transition::Cancelled(reason) => Err(ExportError::Cancelled(reason)),
            Transition::Fatal { extension, reason } => Err(ExportError::SaveFailed { extension, reason }),
        }
    }

    fn strip_file_extension(&self, view: &mut LayerTreeView<H::Handle>, id: ElementId) {
        let element = view.element_mut(id);
        let extension = element.file_extension();
        if extension.is_empty() {
            return;
        }
        let strip = match self.settings.strip_mode {
            ExtensionStripMode::Never => false,
            ExtensionStripMode::IdenticalToDefault => extension == self.default_extension,
            ExtensionStripMode::Always => true,
        };
        if strip {
            element.set_file_extension(None);
        }
    }

    /// Give the element the extension it is saved with and make that the
    /// current extension.
    fn apply_file_extension(&mut self, view: &mut LayerTreeView<H::Handle>, id: ElementId) {
        let element = view.element_mut(id);
        match self.settings.file_extension_mode {
            ExtensionMatchMode::UseAsFileExtension => {
                let extension = element.file_extension();
                if !extension.is_empty() && self.extensions.get(&extension).is_valid {
                    self.current_extension = extension;
                    return;
                }
                element.set_file_extension(Some(self.default_extension.as_str()));
            }
            ExtensionMatchMode::ExportAll => {
                let name = format!("{}.{}", element.name(), self.default_extension);
                element.set_name(name);
            }
            ExtensionMatchMode::OnlyMatchingExtension => {
                element.set_file_extension(Some(self.default_extension.as_str()));
            }
        }
        self.current_extension = self.default_extension.clone();
    }

    fn create_empty_directory(
        &mut self,
        view: &mut LayerTreeView<H::Handle>,
        id: ElementId,
    ) -> Result<(), ExportError> {
        ensure_valid_name(view, id);
        view.finalize_name(id, &self.output_directory, self.include_layer_path(), SuffixPlacement::End);

        let directory = view.file_path(id, &self.output_directory, self.include_layer_path());
        log::debug!("Creating directory {}", directory.display());
        make_dirs(&directory)?;
        Ok(())
    }
}

/// Replace an unusable name with its sanitized form or the fallback name.
fn ensure_valid_name<T>(view: &mut LayerTreeView<T>, id: ElementId) {
    if let Err(e) = view.validate_name(id) {
        let element = view.element_mut(id);
        let replacement = fallback_name(element.name());
        log::warn!("{e}; using '{replacement}'");
        element.set_name(replacement);
    }
}

fn rename<T>(view: &mut LayerTreeView<T>, id: ElementId, rename_fn: fn(&str) -> String) {
    let element = view.element_mut(id);
    let name = rename_fn(element.name());
    element.set_name(name);
}

#[cfg(test)]
#[path = "tests/exporter_tests.rs"]
mod tests;
