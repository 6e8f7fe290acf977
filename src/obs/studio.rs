//! Replay buffer and playback source operations on top of [`ObsClient`].

use std::path::PathBuf;

use obws::requests::inputs::{Create, InputId, SetSettings};
use obws::requests::scene_items::SetEnabled;
use obws::requests::scenes::SceneId;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::client::ObsClient;
use crate::constants::{PLAYBACK_SOURCE_KIND, PLAYBACK_SOURCE_NAME};
use crate::error::{HighlightError, Result};

/// Settings for the VLC media source. `paths` become the playlist.
///
/// Built by hand because the typed `VlcSource` in obws writes the loop flag
/// under the wrong key.
pub fn playback_settings(paths: &[PathBuf]) -> Value {
    let playlist: Vec<Value> = paths
        .iter()
        .map(|path| {
            json!({
                "value": path.to_string_lossy(),
                "hidden": false,
                "selected": false,
            })
        })
        .collect();
    json!({
        "loop": false,
        "shuffle": false,
        "playback_behavior": "stop_restart",
        "playlist": playlist,
        "network_caching": 100,
        "track": 1,
        "subtitle_enable": false,
        "subtitle": 0,
    })
}

impl ObsClient {
    /// Starts the replay buffer unless it is already running.
    pub async fn ensure_replay_buffer(&self) -> Result<()> {
        let replay_buffer = self.api().replay_buffer();
        if self
            .call("GetReplayBufferStatus", replay_buffer.status())
            .await?
        {
            debug!("Replay buffer already active");
            return Ok(());
        }
        self.call("StartReplayBuffer", replay_buffer.start()).await?;
        info!("Replay buffer started");
        Ok(())
    }

    pub async fn save_replay_buffer(&self) -> Result<()> {
        self.call("SaveReplayBuffer", self.api().replay_buffer().save())
            .await?;
        info!("Replay buffer save requested");
        Ok(())
    }

    pub async fn current_program_scene(&self) -> Result<String> {
        let scene = self
            .call(
                "GetCurrentProgramScene",
                self.api().scenes().current_program_scene(),
            )
            .await?;
        Ok(scene.id.name)
    }

    async fn playback_source_exists(&self) -> Result<bool> {
        let inputs = self
            .call(
                "GetInputList",
                self.api().inputs().list(Some(PLAYBACK_SOURCE_KIND)),
            )
            .await?;
        Ok(inputs
            .iter()
            .any(|input| input.id.name == PLAYBACK_SOURCE_NAME))
    }

    /// Creates the hidden playback source in the current program scene.
    pub async fn ensure_playback_source(&self) -> Result<()> {
        if self.playback_source_exists().await? {
            debug!("Playback source already present");
            return Ok(());
        }
        let scene = self.current_program_scene().await?;
        let create = Create {
            scene: SceneId::Name(&scene),
            input: PLAYBACK_SOURCE_NAME,
            kind: PLAYBACK_SOURCE_KIND,
            settings: Some(playback_settings(&[])),
            enabled: Some(false),
        };
        self.call("CreateInput", self.api().inputs().create(create))
            .await?;
        info!(%scene, "Playback source created");
        Ok(())
    }

    /// Loads `paths` into the playback source and shows it in the current scene.
    pub async fn play_clips(&self, paths: &[PathBuf]) -> Result<()> {
        let settings = playback_settings(paths);
        let update = SetSettings {
            input: InputId::Name(PLAYBACK_SOURCE_NAME),
            settings: &settings,
            overlay: Some(true),
        };
        self.call("SetInputSettings", self.api().inputs().set_settings(update))
            .await?;

        let scene = self.current_program_scene().await?;
        let items = self
            .call(
                "GetSceneItemList",
                self.api().scene_items().list(SceneId::Name(&scene)),
            )
            .await?;
        let item_id = items
            .iter()
            .find(|item| item.source_name == PLAYBACK_SOURCE_NAME)
            .map(|item| item.id)
            .ok_or_else(|| {
                HighlightError::Protocol(format!(
                    "{PLAYBACK_SOURCE_NAME} is not in scene {scene}"
                ))
            })?;

        // Hide first so a source that is still visible restarts.
        for enabled in [false, true] {
            let toggle = SetEnabled {
                scene: SceneId::Name(&scene),
                item_id,
                enabled,
            };
            self.call(
                "SetSceneItemEnabled",
                self.api().scene_items().set_enabled(toggle),
            )
            .await?;
        }
        info!(clips = paths.len(), %scene, "Highlight playback started");
        Ok(())
    }
}
