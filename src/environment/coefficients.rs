//! Aerodynamic coefficient interfaces
//!
//! Force coefficients are expressed in the aerodynamic frame as
//! `[C_D, C_S, C_L]` (drag, side force, lift); moment coefficients in the
//! body frame as `[C_l, C_m, C_n]` (roll, pitch, yaw). Tabulated interfaces are
//! built once at setup from a [`CoefficientReader`], which hides all file
//! handling.

use crate::error::ConfigurationError;
use nalgebra::Vector3;

/// Independent variable of a coefficient table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoefficientVariable {
    MachNumber,
    AngleOfAttack,
    AngleOfSideslip,
    Altitude,
    Time,
}

impl CoefficientVariable {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MachNumber => "Mach number",
            Self::AngleOfAttack => "angle of attack",
            Self::AngleOfSideslip => "angle of sideslip",
            Self::Altitude => "altitude",
            Self::Time => "time",
        }
    }
}

/// Aerodynamic coefficients of a vehicle
pub trait AerodynamicCoefficientInterface: Send + Sync {
    fn reference_area(&self) -> f64;

    /// Variables expected, in order, by [`Self::update_current_coefficients`]
    fn independent_variables(&self) -> &[CoefficientVariable];

    fn update_current_coefficients(&mut self, values: &[f64]);

    /// `[C_D, C_S, C_L]` at the last update
    fn current_force_coefficients(&self) -> Vector3<f64>;

    /// `[C_l, C_m, C_n]` at the last update, zero without moment data
    fn current_moment_coefficients(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    /// Moment coefficients at `values`, leaving the current coefficients untouched
    fn moment_coefficients_at(&self, _values: &[f64]) -> Option<Vector3<f64>> {
        None
    }

    fn name(&self) -> &'static str;
}

/// Coefficients independent of flight conditions
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantCoefficients {
    reference_area: f64,
    coefficients: Vector3<f64>,
    moments: Option<Vector3<f64>>,
}

impl ConstantCoefficients {
    pub fn new(reference_area: f64, coefficients: Vector3<f64>) -> Self {
        Self {
            reference_area,
            coefficients,
            moments: None,
        }
    }

    pub fn with_moment_coefficients(mut self, moments: Vector3<f64>) -> Self {
        self.moments = Some(moments);
        self
    }

    /// Pure drag
    pub fn drag_only(reference_area: f64, drag_coefficient: f64) -> Self {
        Self::new(reference_area, Vector3::new(drag_coefficient, 0.0, 0.0))
    }
}

impl AerodynamicCoefficientInterface for ConstantCoefficients {
    fn reference_area(&self) -> f64 {
        self.reference_area
    }

    fn independent_variables(&self) -> &[CoefficientVariable] {
        &[]
    }

    fn update_current_coefficients(&mut self, _values: &[f64]) {}

    fn current_force_coefficients(&self) -> Vector3<f64> {
        self.coefficients
    }

    fn current_moment_coefficients(&self) -> Vector3<f64> {
        self.moments.unwrap_or_default()
    }

    fn moment_coefficients_at(&self, _values: &[f64]) -> Option<Vector3<f64>> {
        self.moments
    }

    fn name(&self) -> &'static str {
        "Constant"
    }
}

/// Output of a [`CoefficientReader`]
///
/// `values` is stored in row-major order over `independent_variables`: the
/// last axis varies fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    pub values: Vec<Vector3<f64>>,
    pub independent_variables: Vec<Vec<f64>>,
}

/// Source of tabulated coefficient data
pub trait CoefficientReader {
    fn read_coefficients(
        &self,
        files: &[String],
        dimensions: usize,
    ) -> Result<CoefficientTable, ConfigurationError>;
}

/// Multilinear interpolation over a rectangular grid, clamped at the edges
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientGrid {
    axes: Vec<Vec<f64>>,
    values: Vec<Vector3<f64>>,
}

impl CoefficientGrid {
    pub fn new(table: CoefficientTable, context: &str) -> Result<Self, ConfigurationError> {
        let expected: usize = table.independent_variables.iter().map(Vec::len).product();
        if table.values.len() != expected {
            return Err(ConfigurationError::DimensionMismatch {
                context: format!("{context} value grid"),
                expected,
                found: table.values.len(),
            });
        }
        for (index, axis) in table.independent_variables.iter().enumerate() {
            if axis.is_empty() || axis.windows(2).any(|pair| pair[1] <= pair[0]) {
                return Err(ConfigurationError::InvalidSettings(format!(
                    "{context}: independent variable {index} must be non-empty and strictly increasing"
                )));
            }
        }
        Ok(Self {
            axes: table.independent_variables,
            values: table.values,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.axes.len()
    }

    pub fn interpolate(&self, point: &[f64]) -> Vector3<f64> {
        // Lower node index and weight of the upper node, per axis
        let cells: Vec<(usize, f64)> = self
            .axes
            .iter()
            .zip(point)
            .map(|(axis, &x)| locate(axis, x))
            .collect();

        let mut result = Vector3::zeros();
        for corner in 0..(1usize << cells.len()) {
            let mut weight = 1.0;
            let mut flat = 0;
            for (axis_index, (lower, upper_weight)) in cells.iter().enumerate() {
                let take_upper = corner & (1 << axis_index) != 0;
                let axis_len = self.axes[axis_index].len();
                let node = if take_upper {
                    (lower + 1).min(axis_len - 1)
                } else {
                    *lower
                };
                weight *= if take_upper {
                    *upper_weight
                } else {
                    1.0 - upper_weight
                };
                flat = flat * axis_len + node;
            }
            if weight != 0.0 {
                result += self.values[flat] * weight;
            }
        }
        result
    }
}

fn locate(axis: &[f64], x: f64) -> (usize, f64) {
    let last = axis.len() - 1;
    if last == 0 || x <= axis[0] {
        return (0, 0.0);
    }
    if x >= axis[last] {
        return (last, 0.0);
    }
    let upper = axis.partition_point(|&node| node <= x);
    let lower = upper - 1;
    (lower, (x - axis[lower]) / (axis[upper] - axis[lower]))
}

/// Coefficients interpolated from a table
///
/// Moment coefficients, when present, are interpolated over the same
/// independent variables as the force coefficients.
pub struct TabulatedCoefficients {
    reference_area: f64,
    variables: Vec<CoefficientVariable>,
    grid: CoefficientGrid,
    moments: Option<CoefficientGrid>,
    current: Vector3<f64>,
    current_moments: Vector3<f64>,
}

impl TabulatedCoefficients {
    pub fn new(
        reference_area: f64,
        variables: Vec<CoefficientVariable>,
        grid: CoefficientGrid,
    ) -> Result<Self, ConfigurationError> {
        if grid.dimensions() != variables.len() {
            return Err(ConfigurationError::DimensionMismatch {
                context: "tabulated aerodynamic coefficients".to_string(),
                expected: variables.len(),
                found: grid.dimensions(),
            });
        }
        Ok(Self {
            reference_area,
            variables,
            grid,
            moments: None,
            current: Vector3::zeros(),
            current_moments: Vector3::zeros(),
        })
    }

    pub fn with_moment_grid(mut self, moments: CoefficientGrid) -> Result<Self, ConfigurationError> {
        if moments.dimensions() != self.variables.len() {
            return Err(ConfigurationError::DimensionMismatch {
                context: "tabulated moment coefficients".to_string(),
                expected: self.variables.len(),
                found: moments.dimensions(),
            });
        }
        self.moments = Some(moments);
        Ok(self)
    }
}

impl AerodynamicCoefficientInterface for TabulatedCoefficients {
    fn reference_area(&self) -> f64 {
        self.reference_area
    }

    fn independent_variables(&self) -> &[CoefficientVariable] {
        &self.variables
    }

    fn update_current_coefficients(&mut self, values: &[f64]) {
        self.current = self.grid.interpolate(values);
        if let Some(moments) = &self.moments {
            self.current_moments = moments.interpolate(values);
        }
    }

    fn current_force_coefficients(&self) -> Vector3<f64> {
        self.current
    }

    fn current_moment_coefficients(&self) -> Vector3<f64> {
        self.current_moments
    }

    fn moment_coefficients_at(&self, values: &[f64]) -> Option<Vector3<f64>> {
        self.moments.as_ref().map(|moments| moments.interpolate(values))
    }

    fn name(&self) -> &'static str {
        "Tabulated"
    }
}

/// Read a coefficient table and wrap it in an interpolating interface
///
/// The file set must describe exactly one axis per independent variable.
pub fn create_tabulated_coefficient_interface(
    reader: &dyn CoefficientReader,
    files: &[String],
    variables: Vec<CoefficientVariable>,
    reference_area: f64,
) -> Result<TabulatedCoefficients, ConfigurationError> {
    let table = reader.read_coefficients(files, variables.len())?;
    if table.independent_variables.len() != variables.len() {
        return Err(ConfigurationError::DimensionMismatch {
            context: format!("coefficient files [{}]", files.join(", ")),
            expected: variables.len(),
            found: table.independent_variables.len(),
        });
    }
    let grid = CoefficientGrid::new(table, "aerodynamic coefficients")?;
    log::debug!(
        "Created tabulated aerodynamic coefficients over {} variable(s)",
        variables.len()
    );
    TabulatedCoefficients::new(reference_area, variables, grid)
}
