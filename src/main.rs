mod conversion;
use conversion::*;

use anyhow::Result;
use greedy_compress::analysis::threshold::CompressOptions;
use greedy_compress::error::AppError;
use greedy_compress::logging;
use greedy_compress::process::CompressionResult;
use greedy_compress::source::INPUT_EXTENSIONS;
use greedy_compress::state::{Session, UiState};
use greedy_compress::taskstatus::*;
use gtk::gdk::Display;
use gtk::glib::{MainContext, Priority, Type};
use gtk::{
    gio, prelude::*, Adjustment, CssProvider, Label, Picture, ProgressBar, ScrolledWindow,
    TextBuffer, STYLE_PROVIDER_PRIORITY_APPLICATION,
};
use gtk::{glib, AlertDialog, Application, ApplicationWindow, Builder, Button};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

const TASK_NAME: &str = "Compressing";

// Short pause between progress waves so the window keeps repainting
const WORKER_PACE: Duration = Duration::from_millis(1);

fn main() -> Result<glib::ExitCode> {
    let application = gtk::Application::new(
        Some("com.github.greedycompress"),
        Default::default(),
    );

    let ui_state = Rc::new(RefCell::new(match UiState::load_from_userhome() {
        Ok(mut ss) => {
            ss.validate_paths();
            ss
        }
        Err(_) => UiState::default(),
    }));

    application.connect_activate(build_styles);
    application.connect_activate(glib::clone!(@strong ui_state => move |app| {
        build_ui(app, ui_state.clone());
    }));
    let exitcode = application.run();

    ui_state.borrow().save_to_userhome()?;
    Ok(exitcode)
}

macro_rules! bind_object {
    ($builder:expr, $obj_id:expr) => {
        if let Some(obj) = $builder.object($obj_id) {
            obj
        } else {
            panic!("Failed to bind object with id '{}'", $obj_id);
        }
    };
}

macro_rules! set_status {
    ($builder:expr, $text:expr) => {
        let lbl_status: Label = bind_object!($builder, "lbl_status");
        lbl_status.set_label($text);
    };
}

macro_rules! show_error {
    ($window:expr, $detail:expr) => {
        let info_dialog = AlertDialog::builder()
            .modal(true)
            .message("Error")
            .detail($detail)
            .build();
        info_dialog.show(Some(&$window));
    };
}

fn build_styles(_application: &Application) {
    let provider = CssProvider::new();
    provider.load_from_data(include_str!("../assets/styles.css"));

    let display = match Display::default() {
        Some(display) => display,
        None => {
            warn!("Could not connect to a display, skipping styles");
            return;
        }
    };

    gtk::style_context_add_provider_for_display(
        &display,
        &provider,
        STYLE_PROVIDER_PRIORITY_APPLICATION,
    );
}

#[allow(deprecated)]
fn build_ui(application: &Application, ui_state: Rc<RefCell<UiState>>) {
    let ui_src = include_str!("../assets/greedy-compress.ui");
    let builder = Builder::from_string(ui_src);

    ////////
    // Logging
    ////////
    let log_buffer: TextBuffer = bind_object!(builder, "txt_log_buffer");
    let scrl_log_output: ScrolledWindow = bind_object!(builder, "scrl_log_output");
    let (log_sender, log_receiver) = MainContext::channel::<String>(Priority::default());

    if let Err(why) = logging::init_with_hook("info", move |s| {
        let _ = log_sender.send(s.to_owned());
    }) {
        eprintln!("Logging already initialized: {}", why);
    }

    log_receiver.attach(
        None,
        glib::clone!(@weak log_buffer, @weak scrl_log_output => @default-return glib::Continue(false),
            move |log_entry| {
                let mut end = log_buffer.end_iter();
                log_buffer.insert(&mut end, "\n");
                log_buffer.insert(&mut end, &log_entry);

                // Scroll to bottom
                let vadjustment = scrl_log_output.vadjustment();
                vadjustment.set_value(vadjustment.upper());

                glib::Continue(true)
            }
        ),
    );

    info!("Starting Greedy Compress");

    let session = Rc::new(RefCell::new(Session::new(CompressOptions {
        pace: Some(WORKER_PACE),
    })));

    let window: ApplicationWindow = bind_object!(builder, "GreedyCompressApplicationMain");
    window.set_application(Some(application));

    let img_original: Picture = bind_object!(builder, "img_original");
    let img_compressed: Picture = bind_object!(builder, "img_compressed");

    ////////
    // Image selection
    ////////
    let btn_select: Button = bind_object!(builder, "btn_select");
    let b = builder.clone();
    btn_select.connect_clicked(glib::clone!(@weak window, @weak img_original, @strong session, @strong ui_state, @weak b as builder => move |_| {
        debug!("Opening image");
        let initial = ui_state.borrow().last_opened_folder.clone();
        open_image_file("Select an Image", &window, initial, glib::clone!(@weak window, @weak img_original, @strong session, @strong ui_state, @weak builder => move |f| {
            debug!("Opened: {:?}", f);
            let loaded = session.borrow_mut().select(&f);
            match loaded {
                Ok(buffer) => {
                    match preview_pixbuf(&buffer) {
                        Ok(pix) => img_original.set_pixbuf(Some(&pix)),
                        Err(why) => error!("Failed to build preview: {:?}", why),
                    }
                    let name = f.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                    set_status!(builder, &format!("Selected: {}", name));
                    if let Some(parent) = f.parent() {
                        info!("Setting last opened folder to {:?}", parent);
                        ui_state.borrow_mut().last_opened_folder = Some(parent.to_owned());
                    }
                }
                Err(why) => {
                    error!("Failed to load image: {}", why);
                    show_error!(window, &why.to_string());
                }
            }
        }));
    }));

    ////////
    // Threshold
    ////////
    let adj_threshold: Adjustment = bind_object!(builder, "adj_threshold");
    let lbl_threshold_value: Label = bind_object!(builder, "lbl_threshold_value");
    let initial_threshold = session
        .borrow_mut()
        .set_threshold(ui_state.borrow().last_threshold as i64);
    adj_threshold.set_value(initial_threshold.value() as f64);
    lbl_threshold_value.set_label(&format!("Threshold: {}", initial_threshold));
    adj_threshold.connect_value_changed(glib::clone!(@weak lbl_threshold_value, @strong session, @strong ui_state => move |e| {
        let threshold = session.borrow_mut().set_threshold(e.value().round() as i64);
        ui_state.borrow_mut().last_threshold = threshold.value();
        lbl_threshold_value.set_label(&format!("Threshold: {}", threshold));
    }));

    ////////
    // Compression
    ////////
    let (process_sender, process_receiver) = MainContext::channel::<TaskStatusContainer>(Priority::default());
    let (result_sender, result_receiver) = MainContext::channel::<CompressionResult>(Priority::default());

    let btn_compress: Button = bind_object!(builder, "btn_compress");
    let progress: ProgressBar = bind_object!(builder, "prg_task_progress");
    let b = builder.clone();
    btn_compress.connect_clicked(glib::clone!(@weak window, @weak progress, @strong session, @weak b as builder => move |_| {
        info!("Compress clicked");
        if session.borrow().is_busy() {
            debug!("Ignoring compress request, a run is already active");
            return;
        }

        progress.set_fraction(0.0);
        let ps = process_sender.clone();
        let rs = result_sender.clone();
        set_task_status(&ps, TASK_NAME, 0.0);

        let started = session.borrow_mut().compress(
            StatusSink::new(ps.clone(), TASK_NAME),
            move |result| {
                if rs.send(result).is_err() {
                    error!("Failed to send compression result");
                }
                set_task_completed(&ps);
            },
        );

        match started {
            Ok(()) => {}
            Err(AppError::NoImageSelected) => {
                set_task_completed(&process_sender);
                show_error!(window, "Please select an image first!");
            }
            Err(why) => {
                set_task_completed(&process_sender);
                set_status!(builder, &format!("Error: {}", why));
            }
        }
    }));

    ////////
    // Task Monitor
    ////////
    let lbl_task_status: Label = bind_object!(builder, "lbl_task_status");
    process_receiver.attach(
        None,
        glib::clone!(@weak lbl_task_status, @weak progress, @weak btn_compress => @default-return glib::Continue(false),
            move |proc_status| {
                match &proc_status.status {
                    Some(TaskStatus::TaskPercentage(task_name, percent)) => {
                        progress.set_fraction(percent / 100.0);
                        lbl_task_status.set_label(&format!("{} ({:.0}%)", task_name, percent));
                        btn_compress.set_sensitive(false);
                    }
                    None => {
                        btn_compress.set_sensitive(true);
                        lbl_task_status.set_label("Ready");
                    }
                };
                glib::Continue(true)
            }
        ),
    );

    let b = builder.clone();
    result_receiver.attach(
        None,
        glib::clone!(@weak img_compressed, @weak progress, @weak b as builder => @default-return glib::Continue(false),
            move |result| {
                match result {
                    Ok(outcome) => {
                        progress.set_fraction(1.0);
                        match preview_pixbuf(&outcome.buffer) {
                            Ok(pix) => img_compressed.set_pixbuf(Some(&pix)),
                            Err(why) => error!("Failed to build preview: {:?}", why),
                        }
                        info!(
                            "{:.1}% of channel values zeroed at threshold {}",
                            outcome.stats.zeroed_percent(),
                            outcome.threshold
                        );
                        set_status!(builder, "Compression completed. Click 'Download Image' to save.");
                    }
                    Err(why) => {
                        set_status!(builder, &format!("Error: {}", why));
                    }
                }
                glib::Continue(true)
            }
        ),
    );

    ////////
    // Download
    ////////
    let btn_download: Button = bind_object!(builder, "btn_download");
    let b = builder.clone();
    btn_download.connect_clicked(glib::clone!(@weak window, @strong session, @strong ui_state, @weak b as builder => move |_| {
        if session.borrow().latest_compressed().is_none() {
            show_error!(window, "No compressed image available. Please compress an image first.");
            return;
        }

        let initial = ui_state.borrow().last_opened_folder.clone();
        save_image_file("Save Compressed Image", &window, initial, glib::clone!(@strong session, @weak builder => move |f| {
            match session.borrow().save_compressed_opt(f) {
                Ok(written) => {
                    let name = written.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                    set_status!(builder, &format!("Image saved: {}", name));
                }
                Err(AppError::EncodeError(why)) => {
                    warn!("Save failed: {}", why);
                    set_status!(builder, &why);
                }
                Err(why) => {
                    set_status!(builder, &format!("Error: {}", why));
                }
            }
        }));
    }));

    set_status!(builder, "Ready");
    window.present();
}

fn image_filters() -> gio::ListStore {
    let filters = gio::ListStore::new(Type::OBJECT);
    let image_filter = gtk::FileFilter::new();
    INPUT_EXTENSIONS.iter().for_each(|ext| {
        image_filter.add_suffix(ext);
    });
    image_filter.set_name(Some("Image Files"));
    filters.append(&image_filter);
    filters
}

fn initial_folder(initial_path: Option<PathBuf>) -> Option<gio::File> {
    initial_path
        .or_else(dirs::home_dir)
        .map(|p| gio::File::for_path(p))
}

fn open_image_file<F>(
    title: &str,
    window: &ApplicationWindow,
    initial_path: Option<PathBuf>,
    callback: F,
) where
    F: Fn(PathBuf) + 'static,
{
    let dialog = gtk::FileDialog::builder()
        .title(title)
        .accept_label("Open")
        .modal(true)
        .filters(&image_filters())
        .build();
    if let Some(folder) = initial_folder(initial_path) {
        dialog.set_initial_folder(Some(&folder));
    }

    dialog.open(Some(window), gio::Cancellable::NONE, move |file| {
        if let Ok(file) = file {
            match file.path() {
                Some(filename) => callback(filename),
                None => error!("Selected file has no local path"),
            }
        }
    });
}

fn save_image_file<F>(
    title: &str,
    window: &ApplicationWindow,
    initial_path: Option<PathBuf>,
    callback: F,
) where
    F: Fn(Option<PathBuf>) + 'static,
{
    let filters = gio::ListStore::new(Type::OBJECT);
    for (name, suffix) in [("PNG files", "png"), ("JPEG files", "jpg")] {
        let filter = gtk::FileFilter::new();
        filter.add_suffix(suffix);
        filter.set_name(Some(name));
        filters.append(&filter);
    }

    let dialog = gtk::FileDialog::builder()
        .title(title)
        .accept_label("Save")
        .modal(true)
        .filters(&filters)
        .initial_name("compressed.png")
        .build();
    if let Some(folder) = initial_folder(initial_path) {
        dialog.set_initial_folder(Some(&folder));
    }

    dialog.save(Some(window), gio::Cancellable::NONE, move |file| {
        // A dismissed dialog comes back as an error
        callback(file.ok().and_then(|f| f.path()));
    });
}
