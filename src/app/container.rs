use std::sync::Arc;

use crate::adapters::{FfmpegCapabilityProbe, FfmpegEngine, FfprobeAdapter, Settings};
use crate::app::{hardware_interactor::HardwareInteractor, render_interactor::RenderInteractor};
use crate::janitor::CacheJanitor;
use crate::ports::{CapabilityProbe, MediaEngine, StreamProbe};

pub trait AppContainer: Send + Sync {
    fn settings(&self) -> Arc<Settings>;
    fn engine(&self) -> Arc<dyn MediaEngine>;
    fn stream_probe(&self) -> Arc<dyn StreamProbe>;
    fn hardware_interactor(&self) -> Arc<HardwareInteractor>;
    fn render_interactor(&self) -> Arc<RenderInteractor>;
    fn janitor(&self) -> CacheJanitor;
}

pub struct DefaultAppContainer {
    settings: Arc<Settings>,
    engine: Arc<dyn MediaEngine>,
    stream_probe: Arc<dyn StreamProbe>,
    hardware_interactor: Arc<HardwareInteractor>,
    render_interactor: Arc<RenderInteractor>,
}

impl DefaultAppContainer {
    /// Wire the ffmpeg adapters configured in `settings`
    pub fn new(settings: Settings) -> Self {
        let engine: Arc<dyn MediaEngine> = Arc::new(FfmpegEngine::new(
            settings.engine.ffmpeg.clone(),
            settings.engine.ffprobe.clone(),
        ));
        Self::with_engine(settings, engine)
    }

    /// Wire every port onto `engine`
    pub fn with_engine(settings: Settings, engine: Arc<dyn MediaEngine>) -> Self {
        let settings = Arc::new(settings);
        let capability_probe: Arc<dyn CapabilityProbe> =
            Arc::new(FfmpegCapabilityProbe::new(Arc::clone(&engine)));
        let stream_probe: Arc<dyn StreamProbe> = Arc::new(FfprobeAdapter::new(Arc::clone(&engine)));

        let hardware_interactor = Arc::new(HardwareInteractor::new(capability_probe));
        let render_interactor = Arc::new(RenderInteractor::new(
            Arc::clone(&engine),
            Arc::clone(&stream_probe),
            Arc::clone(&hardware_interactor),
            Arc::clone(&settings),
        ));

        Self {
            settings,
            engine,
            stream_probe,
            hardware_interactor,
            render_interactor,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }

    fn engine(&self) -> Arc<dyn MediaEngine> {
        Arc::clone(&self.engine)
    }

    fn stream_probe(&self) -> Arc<dyn StreamProbe> {
        Arc::clone(&self.stream_probe)
    }

    fn hardware_interactor(&self) -> Arc<HardwareInteractor> {
        Arc::clone(&self.hardware_interactor)
    }

    fn render_interactor(&self) -> Arc<RenderInteractor> {
        Arc::clone(&self.render_interactor)
    }

    fn janitor(&self) -> CacheJanitor {
        CacheJanitor::new(self.settings.janitor.rules(&self.settings.storage))
    }
}
