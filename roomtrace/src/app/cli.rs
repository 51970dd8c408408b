//! Command dispatch and the simulate pipeline.

use crate::analysis;
use crate::annotation::{color, Annotations, PathAnnotation, Point, Zone};
use crate::app::args::{CliArgs, SimulateOptions, SubCommand};
use crate::app::config::{CeilingPanels, ExperimentConfig, EXAMPLE_CONFIG};
use crate::app::experiment::ExperimentDir;
use crate::error::{Error, ValidationError};
use crate::io::{obj, stl};
use crate::listening::ListeningTriangle;
use crate::material::Material;
use crate::room::{Bounds, Room, T60_REPORT_FREQ_HZ};
use crate::speaker::{Shot, Speaker};
use crate::summary::{AnalysisResults, Summary};
use crate::trace::Arrival;
use rayon::prelude::*;

/// Analysis window for the early-energy aggregate, milliseconds.
const ENERGY_WINDOW_MS: f64 = 25.0;
/// Floor against which arrival gains are measured, dB.
const ENERGY_FLOOR_DB: f64 = -15.0;
/// Grid size and angular half-range of `--trace-surface` diagnostics.
const TARGETED_SHOT_COUNT: usize = 4;
const TARGETED_ANGLE_RANGE: f64 = 5.0;

/// Executes the parsed command line.
pub fn run(args: CliArgs) -> Result<(), Error> {
    match args.command {
        SubCommand::Simulate(opts) => simulate(&opts),
        SubCommand::PrintInfo => {
            println!("# Example roomtrace experiment configuration\n");
            println!("{EXAMPLE_CONFIG}");
            Ok(())
        }
    }
}

/// Output files written into every experiment directory.
struct Outputs<'a> {
    experiment: &'a ExperimentDir,
}

impl Outputs<'_> {
    fn write(
        &self,
        room: &Room,
        annotations: &Annotations,
        summary: &Summary,
    ) -> Result<(), Error> {
        stl::write_binary_stl(&self.experiment.file_path("room.stl"), room.mesh())?;
        annotations.save(&self.experiment.file_path("annotations.json"), room)?;
        summary.save(&self.experiment.file_path("summary.json"))?;
        Ok(())
    }
}

/// Writes the partial outputs after a failed run; a write failure is
/// logged rather than allowed to mask the original error.
fn write_best_effort(outputs: &Outputs, room: &Room, annotations: &Annotations, summary: &Summary) {
    if let Err(err) = outputs.write(room, annotations, summary) {
        log::error!("failed to write outputs after error: {err}");
    }
}

fn simulate(opts: &SimulateOptions) -> Result<(), Error> {
    let text = std::fs::read_to_string(&opts.config)?;
    let config: ExperimentConfig = serde_yaml::from_str(&text)?;

    let experiment = ExperimentDir::create(&opts.output)?;
    experiment.copy_config(&opts.config)?;
    let outputs = Outputs {
        experiment: &experiment,
    };

    let mut summary = Summary::new();
    let mut annotations = Annotations::new();

    if let Err(validation) = config.validate() {
        summary.add_validation_error(&validation);
        write_best_effort(&outputs, &Room::default(), &annotations, &summary);
        return Err(validation.into());
    }

    let objects = obj::read_objects(&config.input.mesh.path, config.input.mesh.scale)?;
    let mut room = Room::from_objects(objects, &config.surface_materials());

    let triangle = config.listening_triangle();
    let listen_pos = triangle.listen_position();
    log::info!(
        "listening position is {:.3} m from the front wall",
        listen_pos.x
    );

    let spec = config.loudspeaker_spec();
    let speakers = [
        Speaker::new(
            "left source",
            spec.clone(),
            triangle.left_source_position(),
            triangle.left_source_normal(),
        ),
        Speaker::new(
            "right source",
            spec,
            triangle.right_source_position(),
            triangle.right_source_normal(),
        ),
    ];

    if !(opts.skip_speaker_in_room_check || config.flags.skip_speaker_in_room_check) {
        for speaker in &speakers {
            if let Err(violation) = speaker.is_inside_room(room.mesh(), listen_pos) {
                let validation = ValidationError::SpeakerOutsideRoom {
                    speaker: speaker.name.clone(),
                    vertex: violation.vertex,
                    obstruction: violation.obstruction,
                };
                log::error!("{validation}");
                annotations.points.push(
                    Point::new(violation.vertex)
                        .named(format!("{} offending vertex", speaker.name))
                        .colored(color::PASTEL_RED),
                );
                if let Some(obstruction) = violation.obstruction {
                    annotations.points.push(
                        Point::new(obstruction)
                            .named(format!("{} obstruction", speaker.name))
                            .colored(color::PASTEL_RED),
                    );
                    annotations.paths.push(PathAnnotation {
                        points: vec![Point::new(violation.vertex), Point::new(obstruction)],
                        name: None,
                        color: Some(color::PASTEL_RED.to_string()),
                        thickness: None,
                    });
                }
                summary.add_validation_error(&validation);
                write_best_effort(&outputs, &room, &annotations, &summary);
                return Err(validation.into());
            }
        }
    }

    if !(opts.skip_add_speaker_wall || config.flags.skip_add_speaker_wall) {
        room.add_wall(
            triangle.left_source_position(),
            triangle.left_source_normal(),
            "Left Speaker Wall",
            config.material_for_surface("Left Speaker Wall", Material::perfect_reflector()),
        );
        room.add_wall(
            triangle.right_source_position(),
            triangle.right_source_normal(),
            "Right Speaker Wall",
            config.material_for_surface("Right Speaker Wall", Material::perfect_reflector()),
        );
    }

    if let Some(panels) = &config.ceiling_panels {
        add_ceiling_panels(&mut room, &triangle, &config, panels);
    }

    if let Some(absorbers) = &config.wall_absorbers {
        let material = config
            .material(&absorbers.material)
            .expect("validated material reference");
        for name in &absorbers.surfaces {
            let Some(id) = room.surface_id(name) else {
                let validation = ValidationError::InvalidConfig {
                    field: "wall_absorbers.surfaces".to_string(),
                    reason: format!("surface {name:?} does not exist in the mesh"),
                };
                summary.add_validation_error(&validation);
                write_best_effort(&outputs, &room, &annotations, &summary);
                return Err(validation.into());
            };
            let panel = room
                .surface(id)
                .absorber(absorbers.thickness, absorbers.height, material.clone());
            room.add_surface(panel);
        }
    }

    let params = config.trace_params();
    let shots: Vec<Shot> = speakers
        .iter()
        .flat_map(|s| {
            s.sample(
                config.simulation.shot_count,
                config.simulation.shot_angle_range,
                config.simulation.shot_angle_range,
            )
        })
        .collect();
    let total_shots = shots.len();
    log::info!("tracing {total_shots} shots against {} triangles", room.mesh().len());

    let traced: Result<Vec<Vec<Arrival>>, _> = shots
        .par_iter()
        .map(|shot| room.trace_shot(*shot, listen_pos, params))
        .collect();

    annotations.points.push(
        Point::new(listen_pos)
            .named("listening position")
            .colored(color::PASTEL_GREEN),
    );
    for speaker in &speakers {
        annotations.points.push(
            Point::new(speaker.position)
                .named(speaker.name.clone())
                .colored(color::PASTEL_BLUE),
        );
    }
    annotations.zones.push(Zone {
        center: listen_pos,
        radius: params.rfz_radius,
        name: Some("RFZ".to_string()),
        color: None,
        transparency: None,
    });

    let per_shot = match traced {
        Ok(per_shot) => per_shot,
        Err(err) => {
            log::error!("{err}");
            summary.add_simulation_error(&err);
            summary.results.listen_pos_x = listen_pos.x;
            write_best_effort(&outputs, &room, &annotations, &summary);
            return Err(err.into());
        }
    };

    // Deterministic ordering regardless of how the shots were scheduled:
    // distance ascending, ties broken by emission index.
    let mut indexed: Vec<(usize, Arrival)> = per_shot
        .into_iter()
        .enumerate()
        .flat_map(|(index, list)| list.into_iter().map(move |a| (index, a)))
        .collect();
    indexed.sort_by(|a, b| a.1.distance.total_cmp(&b.1.distance).then(a.0.cmp(&b.0)));
    let arrivals: Vec<Arrival> = indexed.into_iter().map(|(_, a)| a).collect();
    log::info!("{} arrivals within the RFZ", arrivals.len());

    let energy = analysis::energy_over_window(&arrivals, ENERGY_WINDOW_MS, ENERGY_FLOOR_DB);
    summary.results = AnalysisResults {
        itd_ms: analysis::itd_ms(&arrivals, listen_pos).unwrap_or_default(),
        avg_energy_over_window: energy / total_shots as f64,
        listen_pos_x: listen_pos.x,
        volume: room.volume(),
        t60_sabine: room.t60_sabine(T60_REPORT_FREQ_HZ),
        t60_eyring: room.t60_eyring(T60_REPORT_FREQ_HZ),
        schroeder_freq: room.schroeder_frequency(),
    };
    summary.mark_success();

    annotations.arrivals = arrivals;

    // Targeted diagnostics: shoot a tight grid at the requested surfaces
    // and keep the full paths, RFZ or not, in a distinct color.
    for name in &opts.trace_surface {
        let Some(id) = room.surface_id(name) else {
            log::warn!("--trace-surface: no surface named {name:?}");
            continue;
        };
        let Some(bounds) = room.surface(id).bounding_box() else {
            log::warn!("--trace-surface: surface {name:?} has no mesh of its own");
            continue;
        };
        let target = bounds.center();
        for speaker in &speakers {
            let shots = speaker.sample_with_normal(
                target - speaker.position,
                TARGETED_SHOT_COUNT,
                TARGETED_ANGLE_RANGE,
                TARGETED_ANGLE_RANGE,
            );
            for shot in shots {
                match room.trace_shot_unconditional(shot, listen_pos, params) {
                    Ok(arrival) => {
                        annotations.arrivals.push(arrival);
                        let index = annotations.arrivals.len() - 1;
                        annotations.set_arrival_color(index, color::PASTEL_LAVENDER);
                    }
                    Err(err) => log::warn!("targeted trace at {name:?} failed: {err}"),
                }
            }
        }
    }

    outputs.write(&room, &annotations, &summary)?;
    Ok(())
}

/// Adds the configured ceiling panels as prisms hanging under the
/// ceiling, centered on the listening axis.
fn add_ceiling_panels(
    room: &mut Room,
    triangle: &ListeningTriangle,
    config: &ExperimentConfig,
    panels: &CeilingPanels,
) {
    let material = panels
        .material
        .as_deref()
        .and_then(|name| config.material(name))
        .unwrap_or_else(Material::perfect_absorber);
    let center_y = triangle.reference_position.y;

    if let Some(center) = &panels.center {
        room.add_prism(
            Bounds::new(center.x_min, center.x_max),
            Bounds::new(center_y - center.width / 2.0, center_y + center.width / 2.0),
            Bounds::new(center.height, center.height + center.thickness),
            "Center Ceiling Absorber",
            material.clone(),
        );
    }

    if let Some(sides) = &panels.sides {
        for (name, offset) in [
            ("Left Ceiling Absorber", -sides.spacing / 2.0),
            ("Right Ceiling Absorber", sides.spacing / 2.0),
        ] {
            room.add_prism(
                Bounds::new(sides.x_min, sides.x_max),
                Bounds::new(
                    center_y + offset - sides.width / 2.0,
                    center_y + offset + sides.width / 2.0,
                ),
                Bounds::new(sides.height, sides.height + sides.thickness),
                name,
                material.clone(),
            );
        }
    }
}
