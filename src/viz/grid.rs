use std::collections::HashSet;

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType},
};

use crate::gym::{DroneGrid, Pos};

/// Terminal columns per grid cell
const CELL_WIDTH: u16 = 3;

const DRONE: Color = Color::Rgb(0x34, 0x98, 0xdb);
const TARGET: Color = Color::Rgb(0x2e, 0xcc, 0x71);
const OBSTACLE: Color = Color::Rgb(0xe7, 0x4c, 0x3c);
const FLOOR: Color = Color::Rgb(0xec, 0xf0, 0xf1);
const TRAIL: Color = Color::Rgb(0x9b, 0x59, 0xb6);

/// Draws the grid with obstacles, target, drone and the trail of the current episode
pub struct GridView<'a> {
    env: &'a DroneGrid,
}

impl<'a> GridView<'a> {
    pub fn new(env: &'a DroneGrid) -> Self {
        Self { env }
    }

    /// Rows needed to draw the whole grid, borders included
    pub fn height(&self) -> u16 {
        self.env.grid_size() as u16 + 2
    }

    /// Columns needed to draw the whole grid, borders included
    pub fn width(&self) -> u16 {
        self.env.grid_size() as u16 * CELL_WIDTH + 2
    }

    fn cell(&self, pos: Pos, trail: &HashSet<Pos>) -> (&'static str, Style) {
        let floor = Style::default().bg(FLOOR);
        if pos == self.env.pos() {
            let bg = if pos == self.env.target() { TARGET } else { FLOOR };
            (" ● ", floor.bg(bg).fg(DRONE).add_modifier(Modifier::BOLD))
        } else if pos == self.env.target() {
            (" T ", floor.bg(TARGET).fg(Color::White).add_modifier(Modifier::BOLD))
        } else if self.env.is_obstacle(pos) {
            (" X ", floor.bg(OBSTACLE).fg(Color::White).add_modifier(Modifier::BOLD))
        } else if trail.contains(&pos) {
            (" · ", floor.fg(TRAIL).add_modifier(Modifier::BOLD))
        } else {
            ("   ", floor)
        }
    }
}

impl Widget for GridView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title("Drone Navigation");
        let inner = block.inner(area);
        block.render(area, buf);

        let trail: HashSet<Pos> = self.env.path().iter().copied().collect();
        let size = self.env.grid_size();
        for row in 0..size {
            let y = inner.y + row as u16;
            if y >= inner.bottom() {
                break;
            }
            for col in 0..size {
                let x = inner.x + col as u16 * CELL_WIDTH;
                if x + CELL_WIDTH > inner.right() {
                    break;
                }
                let (symbol, style) = self.cell((row, col), &trail);
                buf.set_string(x, y, symbol, style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gym::{Action, DroneGridConfig};

    fn symbol_at(buf: &Buffer, pos: Pos) -> &str {
        let x = 1 + pos.1 as u16 * CELL_WIDTH + 1;
        let y = 1 + pos.0 as u16;
        buf.get(x, y).symbol()
    }

    #[test]
    fn draws_every_cell_kind() {
        let mut env = DroneGrid::new(DroneGridConfig::default()).unwrap();
        env.move_drone(Action::Down);
        env.move_drone(Action::Right);

        let view = GridView::new(&env);
        let mut buf = Buffer::empty(Rect::new(0, 0, view.width(), view.height()));
        view.render(buf.area, &mut buf);

        assert_eq!(symbol_at(&buf, (2, 2)), "●", "Drone");
        assert_eq!(symbol_at(&buf, (6, 7)), "T", "Target");
        assert_eq!(symbol_at(&buf, (1, 0)), "X", "Obstacle");
        assert_eq!(symbol_at(&buf, (1, 1)), "·", "Trail");
        assert_eq!(symbol_at(&buf, (0, 0)), " ", "Empty floor");
    }

    #[test]
    fn clips_to_small_areas() {
        let env = DroneGrid::new(DroneGridConfig::default()).unwrap();
        let mut buf = Buffer::empty(Rect::new(0, 0, 6, 4));
        GridView::new(&env).render(buf.area, &mut buf);
        assert_eq!(buf.get(2, 2).symbol(), "X", "First visible cell still drawn");
    }
}
