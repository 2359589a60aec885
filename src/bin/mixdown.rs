//! mixdown - offline bounce of a small demo mix
//!
//! Run with: cargo run [output.wav]
//!
//! Builds a two-channel mix (lead and bass sines through EQ and
//! compression, summed into a subgroup, with a shared reverb return),
//! schedules some fader automation, renders four bars offline, and
//! writes the result to a WAV file.

use color_eyre::eyre::WrapErr;

use mixdown_dsp::dsp::compressor::{CompressorSettings, SoftKneeCompressor};
use mixdown_dsp::dsp::eq::{EqSettings, ThreeBandEq};
use mixdown_dsp::dsp::reverb::{PlateReverb, ReverbSettings};
use mixdown_dsp::modules::SineOscillator;
use mixdown_dsp::{
    AudioBuffer, AudioModule, EngineConfig, MixerChannel, MixerGraph, MixerReturnBus,
    MixerSendConfig, MixerSubgroup, TempoMap,
};

fn build_graph(config: EngineConfig) -> color_eyre::Result<MixerGraph> {
    let mut graph = MixerGraph::new(config);

    let mut lead_osc = SineOscillator::new("lead_osc", config);
    lead_osc.set_parameter("frequency_hz", Some(440.0))?;
    lead_osc.set_parameter("amplitude", Some(0.4))?;
    let lead = MixerChannel::new("lead", Box::new(lead_osc), config)
        .with_insert(Box::new(ThreeBandEq::new(
            config,
            EqSettings {
                low_gain_db: -2.0,
                high_gain_db: 3.0,
                ..EqSettings::default()
            },
        )))
        .with_pan(-0.3)
        .with_send(MixerSendConfig::new("fx").with_level_db(-9.0));
    graph.add_channel(lead)?;

    let mut bass_osc = SineOscillator::new("bass_osc", config);
    bass_osc.set_parameter("frequency_hz", Some(110.0))?;
    bass_osc.set_parameter("amplitude", Some(0.5))?;
    let bass = MixerChannel::new("bass", Box::new(bass_osc), config)
        .with_insert(Box::new(SoftKneeCompressor::new(
            config,
            CompressorSettings {
                threshold_db: -18.0,
                ratio: 4.0,
                makeup_gain_db: 2.0,
                ..CompressorSettings::default()
            },
        )))
        .with_pan(0.2);
    graph.add_channel(bass)?;

    graph.add_subgroup(MixerSubgroup::new("synths", config).with_fader_db(-3.0))?;
    graph.assign_channel_to_group("lead", "synths")?;
    graph.assign_channel_to_group("bass", "synths")?;

    graph.add_return_bus(
        MixerReturnBus::new("fx")
            .with_processor(Box::new(PlateReverb::new(config, ReverbSettings::default())))
            .with_level_db(-6.0),
    )?;

    Ok(graph)
}

fn write_wav(path: &str, audio: &AudioBuffer, config: EngineConfig) -> color_eyre::Result<()> {
    let spec = hound::WavSpec {
        channels: config.channels as u16,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).wrap_err_with(|| format!("creating {path}"))?;
    for &sample in audio.samples() {
        let quantized = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(quantized)?;
    }
    writer.finalize()?;
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "mixdown.wav".to_string());

    let config = EngineConfig::default();
    let tempo = TempoMap::new(120.0, 4)?;
    let mut graph = build_graph(config)?;

    // Ride the lead fader down and back over the first two bars, and
    // open the reverb send for the second half.
    graph.schedule_parameter_change_in_beats(
        "channel:lead",
        "fader_db",
        Some(-9.0),
        4.0,
        &tempo,
        "bar 2 dip",
    )?;
    graph.schedule_parameter_change_in_beats(
        "channel:lead",
        "fader_db",
        Some(0.0),
        8.0,
        &tempo,
        "bar 3 restore",
    )?;
    graph.schedule_parameter_change_in_beats(
        "channel:lead",
        "send:fx",
        Some(-3.0),
        8.0,
        &tempo,
        "verse reverb",
    )?;

    let duration = tempo.bars_to_seconds(4.0);
    let audio = graph.render(duration)?;
    write_wav(&output_path, &audio, config)?;

    let master = graph.master_meter();
    println!(
        "Rendered {:.2}s ({} frames) to {}",
        duration,
        audio.frames(),
        output_path
    );
    println!(
        "Master (last block): peak {:.1} dB, rms {:.1} dB",
        master.peak_db, master.rms_db
    );
    println!(
        "Integrated loudness: {:.1} LUFS",
        mixdown_dsp::metrics::integrated_lufs(&audio, config.sample_rate)
    );
    Ok(())
}
